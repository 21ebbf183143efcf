//! Component nodes: lifecycle state machine and render pipeline.
//!
//! A [`ComponentNode`] is a cheap handle over the tree node that owns the
//! user component, its props/state/env cells, the child mapping, and the
//! private metadata record. The metadata is deliberately kept out of the
//! user-visible component so subclass state can never shadow framework
//! bookkeeping.
//!
//! Rendering spans an awaited boundary (the pre-render hook and child
//! renders are asynchronous), so multiple renders may be requested before
//! the first completes. Every render attempt bumps `render_id` and captures
//! it as a fencing token; on completion the result is committed only if the
//! token still matches, so the most recently requested render always wins
//! regardless of completion order. Destruction sets a flag checked at every
//! suspension resumption point, short-circuiting pending renders to no-ops.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::future::{LocalBoxFuture, Shared, WeakShared};
use futures::FutureExt;
use indexmap::IndexMap;
use log::trace;

use crate::collections::map::HashMap;
use crate::{
    AnchorLookup, Component, ComponentId, DisplayNode, Env, HandlerCache, HookError,
    LifecycleError, LiveElement, PatchError, PatchTarget, Props, Record, RenderContext,
    TemplateEngine, UpdatePolicy, Visit, WeakLiveElement,
};

pub type RenderFuture = LocalBoxFuture<'static, Result<(), LifecycleError>>;
/// Handle to an in-flight render. Shared so a redundant update can await the
/// same completion as the original request.
pub type RenderHandle = Shared<RenderFuture>;

/// Non-owning lookup a component may hold toward a child component or a raw
/// live element.
#[derive(Clone)]
pub enum NodeRef {
    Component(WeakComponentNode),
    Element(WeakLiveElement),
}

impl NodeRef {
    pub fn component(&self) -> Option<ComponentNode> {
        match self {
            NodeRef::Component(weak) => weak.upgrade(),
            NodeRef::Element(_) => None,
        }
    }

    pub fn element(&self) -> Option<LiveElement> {
        match self {
            NodeRef::Element(weak) => weak.upgrade(),
            NodeRef::Component(weak) => weak.upgrade().and_then(|node| node.live_element()),
        }
    }
}

/// Per-component bookkeeping, attached 1:1 to the component with the same
/// lifetime and never exposed to user code.
#[derive(Default)]
struct Meta {
    vnode: Option<DisplayNode>,
    element: Option<LiveElement>,
    is_started: bool,
    is_mounted: bool,
    is_destroyed: bool,
    render_id: u64,
    render_props: Option<Props>,
    render_promise: Option<WeakShared<RenderFuture>>,
    handlers: HandlerCache,
    refs: HashMap<String, NodeRef>,
}

struct NodeInner {
    id: ComponentId,
    component: RefCell<Box<dyn Component>>,
    props: RefCell<Props>,
    state: RefCell<Record>,
    env: RefCell<Env>,
    parent: RefCell<Option<WeakComponentNode>>,
    children: RefCell<IndexMap<ComponentId, ComponentNode>>,
    meta: RefCell<Meta>,
    engine: Rc<dyn TemplateEngine>,
    patcher: Rc<dyn crate::Patcher>,
}

#[derive(Clone)]
pub struct ComponentNode {
    inner: Rc<NodeInner>,
}

#[derive(Clone)]
pub struct WeakComponentNode(Weak<NodeInner>);

impl WeakComponentNode {
    pub fn upgrade(&self) -> Option<ComponentNode> {
        self.0.upgrade().map(|inner| ComponentNode { inner })
    }
}

impl ComponentNode {
    /// Root construction path: an explicit environment, no parent.
    pub fn root(
        component: Box<dyn Component>,
        props: Props,
        env: Env,
        engine: Rc<dyn TemplateEngine>,
        patcher: Rc<dyn crate::Patcher>,
    ) -> ComponentNode {
        ComponentNode {
            inner: Rc::new(NodeInner {
                id: ComponentId::next(),
                component: RefCell::new(component),
                props: RefCell::new(props),
                state: RefCell::new(Record::new()),
                env: RefCell::new(env),
                parent: RefCell::new(None),
                children: RefCell::new(IndexMap::new()),
                meta: RefCell::new(Meta::default()),
                engine,
                patcher,
            }),
        }
    }

    /// Child construction path: inherits the parent's environment by sharing
    /// (delegation happens lazily on the first env write) and registers the
    /// node in the parent's child mapping under its own id.
    pub fn child_of(
        parent: &ComponentNode,
        component: Box<dyn Component>,
        props: Props,
    ) -> ComponentNode {
        let child = ComponentNode {
            inner: Rc::new(NodeInner {
                id: ComponentId::next(),
                component: RefCell::new(component),
                props: RefCell::new(props),
                state: RefCell::new(Record::new()),
                env: RefCell::new(parent.env()),
                parent: RefCell::new(Some(parent.downgrade())),
                children: RefCell::new(IndexMap::new()),
                meta: RefCell::new(Meta::default()),
                engine: Rc::clone(&parent.inner.engine),
                patcher: Rc::clone(&parent.inner.patcher),
            }),
        };
        parent
            .inner
            .children
            .borrow_mut()
            .insert(child.id(), child.clone());
        child
    }

    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    pub fn downgrade(&self) -> WeakComponentNode {
        WeakComponentNode(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &ComponentNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn props(&self) -> Props {
        self.inner.props.borrow().clone()
    }

    pub fn state(&self) -> Record {
        self.inner.state.borrow().clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&Record) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    pub fn env(&self) -> Env {
        self.inner.env.borrow().clone()
    }

    pub fn parent(&self) -> Option<ComponentNode> {
        self.inner
            .parent
            .borrow()
            .as_ref()
            .and_then(|weak| weak.upgrade())
    }

    /// Child handles in child-map (creation) order.
    pub fn children(&self) -> Vec<ComponentNode> {
        self.inner.children.borrow().values().cloned().collect()
    }

    pub fn child(&self, id: ComponentId) -> Option<ComponentNode> {
        self.inner.children.borrow().get(&id).cloned()
    }

    pub fn is_started(&self) -> bool {
        self.inner.meta.borrow().is_started
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.meta.borrow().is_mounted
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.meta.borrow().is_destroyed
    }

    /// Current fencing token. Incremented at the start of every render
    /// attempt.
    pub fn render_id(&self) -> u64 {
        self.inner.meta.borrow().render_id
    }

    /// The last committed display-tree node, absent before the first render
    /// completes.
    pub fn committed_vnode(&self) -> Option<DisplayNode> {
        self.inner.meta.borrow().vnode.clone()
    }

    pub fn live_element(&self) -> Option<LiveElement> {
        self.inner.meta.borrow().element.clone()
    }

    pub fn set_ref(&self, name: impl Into<String>, target: NodeRef) {
        self.inner.meta.borrow_mut().refs.insert(name.into(), target);
    }

    pub fn get_ref(&self, name: &str) -> Option<NodeRef> {
        self.inner.meta.borrow().refs.get(name).cloned()
    }

    // ---- lifecycle -------------------------------------------------------

    /// Runs start if needed (pre-render hook plus first render), patches the
    /// produced node into a fresh element, appends it under `target`, and,
    /// when the target is already part of the displayed document, walks the
    /// subtree top-down firing `mounted` on every newly attached component.
    pub fn mount(&self, target: &LiveElement) -> RenderFuture {
        let node = self.clone();
        let target = target.clone();
        Box::pin(async move {
            if node.is_destroyed() || node.is_mounted() {
                return Ok(());
            }
            if !node.is_started() {
                node.start().await?;
                if node.is_destroyed() {
                    // destroyed while starting: nothing to attach
                    return Ok(());
                }
            }
            let element = match node.materialize().map_err(LifecycleError::Patch)? {
                Some(element) => element,
                None => return Ok(()),
            };
            target.append_child(&element);
            if target.is_connected() {
                node.propagate_mounted()?;
            }
            Ok(())
        })
    }

    /// For manually-managed children created outside the engine's own
    /// instantiation path: adopts a parentless child into this node's child
    /// mapping (so destruction reaches it), appends its existing live
    /// element under `target`, then runs the same mount propagation step.
    pub fn attach_child(
        &self,
        child: &ComponentNode,
        target: &LiveElement,
    ) -> Result<(), LifecycleError> {
        if child.parent().is_none() {
            *child.inner.parent.borrow_mut() = Some(self.downgrade());
            self.inner
                .children
                .borrow_mut()
                .insert(child.id(), child.clone());
        }
        if let Some(element) = child.live_element() {
            target.append_child(&element);
        }
        child.propagate_mounted()
    }

    /// Mirror traversal of mount propagation: fires `will_unmount` top-down
    /// over the currently mounted subtree, stopping below any node that is
    /// not mounted, then removes the live element.
    pub fn detach(&self) -> Result<(), LifecycleError> {
        if self.is_mounted() {
            self.unmount_subtree()?;
        }
        if let Some(element) = self.live_element() {
            element.remove();
        }
        Ok(())
    }

    /// Recursively destroys all descendants before firing `destroyed` on
    /// this node. Idempotent: destroying a destroyed component is a no-op.
    pub fn destroy(&self) -> Result<(), LifecycleError> {
        if self.is_destroyed() {
            return Ok(());
        }
        trace!("destroying component {}", self.id());
        if self.is_mounted() {
            self.unmount_subtree()?;
        }
        self.destroy_subtree()?;
        if let Some(parent) = self.parent() {
            parent.inner.children.borrow_mut().shift_remove(&self.id());
        }
        Ok(())
    }

    fn destroy_subtree(&self) -> Result<(), LifecycleError> {
        for child in self.children() {
            child.destroy_subtree()?;
        }
        self.inner.children.borrow_mut().clear();
        if let Some(element) = self.live_element() {
            element.remove();
        }
        {
            let mut meta = self.inner.meta.borrow_mut();
            meta.is_destroyed = true;
            meta.is_mounted = false;
            meta.render_promise = None;
        }
        self.inner
            .component
            .borrow_mut()
            .destroyed(self)
            .map_err(LifecycleError::Hook)
    }

    /// CREATED → STARTING → STARTED: captures the props snapshot, awaits the
    /// pre-render hook, then performs the first render. A component destroyed
    /// while starting produces a placeholder empty node and fires no further
    /// lifecycle hooks.
    fn start(&self) -> RenderFuture {
        let node = self.clone();
        Box::pin(async move {
            node.inner.meta.borrow_mut().render_props = Some(node.props());
            let hook = node.inner.component.borrow_mut().will_start(&node);
            hook.await.map_err(LifecycleError::Hook)?;
            if node.is_destroyed() {
                node.inner.meta.borrow_mut().vnode = Some(DisplayNode::empty());
                return Ok(());
            }
            node.inner.meta.borrow_mut().is_started = true;
            node.render(false).await
        })
    }

    /// Orchestrates one render attempt. The template call is synchronous;
    /// the single suspension point is waiting for the pending child-render
    /// promises, after which destruction and the fencing token are checked
    /// before the node is committed.
    pub fn render(&self, force: bool) -> RenderHandle {
        if self.is_destroyed() {
            let noop: RenderFuture = Box::pin(std::future::ready(Ok(())));
            return noop.shared();
        }
        let captured = {
            let mut meta = self.inner.meta.borrow_mut();
            meta.render_id += 1;
            meta.render_id
        };
        let handlers = self.inner.meta.borrow().handlers.clone();
        let mut ctx = RenderContext::new(handlers, force);
        let template = self.inner.component.borrow().template().to_string();
        let produced = self.inner.engine.render(&template, self, &mut ctx);
        let pending = std::mem::take(&mut ctx.pending);

        let node = self.clone();
        let future: RenderFuture = Box::pin(async move {
            let dnode = produced?.keyed(node.id());
            for result in futures::future::join_all(pending).await {
                result?;
            }
            if node.is_destroyed() {
                trace!("render of destroyed component {} dropped", node.id());
                return Ok(());
            }
            if node.render_id() != captured {
                trace!(
                    "stale render {} of component {} superseded by {}",
                    captured,
                    node.id(),
                    node.render_id()
                );
                return Ok(());
            }
            node.commit(dnode)
        });
        let shared = future.shared();
        self.inner.meta.borrow_mut().render_promise = shared.downgrade();
        shared
    }

    /// Applies a completed render. Whenever a live element exists it is
    /// patched, so the element reflects the committed vnode even while the
    /// component is detached or waiting for its target to connect; the
    /// `will_patch`/`patched` hooks fire only around patches of a mounted
    /// component. The committed vnode is replaced atomically, never
    /// partially.
    fn commit(&self, dnode: DisplayNode) -> Result<(), LifecycleError> {
        let target = {
            let meta = self.inner.meta.borrow();
            meta.element
                .clone()
                .map(|element| (element, meta.vnode.clone(), meta.is_mounted))
        };
        match target {
            Some((element, previous, mounted)) => {
                if mounted {
                    self.inner
                        .component
                        .borrow_mut()
                        .will_patch(self)
                        .map_err(LifecycleError::Hook)?;
                }
                let patched = match &previous {
                    Some(previous) => self.inner.patcher.patch(
                        PatchTarget::Committed {
                            element: &element,
                            previous,
                        },
                        &dnode,
                        self,
                    ),
                    None => self
                        .inner
                        .patcher
                        .patch(PatchTarget::Fresh(&element), &dnode, self),
                }
                .map_err(LifecycleError::Patch)?;
                {
                    let mut meta = self.inner.meta.borrow_mut();
                    meta.element = Some(patched);
                    meta.vnode = Some(dnode);
                }
                if mounted {
                    self.inner
                        .component
                        .borrow_mut()
                        .patched(self)
                        .map_err(LifecycleError::Hook)?;
                }
                Ok(())
            }
            None => {
                self.inner.meta.borrow_mut().vnode = Some(dnode);
                Ok(())
            }
        }
    }

    /// Builds the live element from the committed node if it does not exist
    /// yet, resolving child anchors recursively.
    pub fn materialize(&self) -> Result<Option<LiveElement>, PatchError> {
        if let Some(element) = self.live_element() {
            return Ok(Some(element));
        }
        let vnode = self.committed_vnode();
        match vnode {
            Some(vnode) => {
                let host = LiveElement::detached("host");
                let element = self
                    .inner
                    .patcher
                    .patch(PatchTarget::Fresh(&host), &vnode, self)?;
                self.inner.meta.borrow_mut().element = Some(element.clone());
                Ok(Some(element))
            }
            None => Ok(None),
        }
    }

    // ---- update entry points --------------------------------------------

    /// Merges fields into the state in place. Empty partials are a complete
    /// no-op; under [`UpdatePolicy::OnChange`] so are partials that change
    /// nothing. Renders only once the first render has completed, and always
    /// settles with a `patched` call.
    pub fn update_state(&self, partial: Record) -> RenderFuture {
        let node = self.clone();
        Box::pin(async move {
            if node.is_destroyed() || partial.is_empty() {
                return Ok(());
            }
            let policy = node.inner.component.borrow().update_policy();
            if policy == UpdatePolicy::OnChange
                && !node.with_state(|state| state.changes_any(&partial))
            {
                return Ok(());
            }
            node.inner.state.borrow_mut().merge(&partial);
            let rendered = if node.is_started() {
                node.render(false).await?;
                true
            } else {
                false
            };
            node.settle_patched(rendered)
        })
    }

    /// Replaces the props wholesale. A reference-identical, unforced update
    /// merely awaits the in-flight render; otherwise the component's
    /// `should_update` predicate decides whether to replace and render.
    pub fn update_props(&self, next: Props, force: bool) -> RenderFuture {
        let node = self.clone();
        Box::pin(async move {
            if node.is_destroyed() {
                return Ok(());
            }
            let redundant = {
                let meta = node.inner.meta.borrow();
                !force
                    && meta
                        .render_props
                        .as_ref()
                        .map(|props| props.ptr_eq(&next))
                        .unwrap_or(false)
            };
            if redundant {
                let in_flight = node
                    .inner
                    .meta
                    .borrow()
                    .render_promise
                    .as_ref()
                    .and_then(|weak| weak.upgrade());
                if let Some(in_flight) = in_flight {
                    return in_flight.await;
                }
                return Ok(());
            }
            let should = force || {
                let current = node.inner.props.borrow();
                node.inner
                    .component
                    .borrow()
                    .should_update(current.record(), next.record())
            };
            if !should {
                return Ok(());
            }
            *node.inner.props.borrow_mut() = next.clone();
            node.inner.meta.borrow_mut().render_props = Some(next);
            node.render(force).await
        })
    }

    /// Copy-on-write environment update: forks the env first when it is
    /// still shared with the parent, merges the partial, then forces a full
    /// re-render of this subtree only if mounted. Always settles with a
    /// `patched` call.
    pub fn update_env(&self, partial: Record) -> RenderFuture {
        let node = self.clone();
        Box::pin(async move {
            if node.is_destroyed() {
                return Ok(());
            }
            {
                let parent_env = node.parent().map(|parent| parent.env());
                let mut env = node.inner.env.borrow_mut();
                if let Some(parent_env) = parent_env {
                    if parent_env.ptr_eq(&env) {
                        let forked = env.fork();
                        *env = forked;
                    }
                }
                env.merge(&partial);
            }
            let rendered = if node.is_mounted() {
                node.render(true).await?;
                true
            } else {
                false
            };
            node.settle_patched(rendered)
        })
    }

    /// Fires `patched` for updates that settled without a committed patch;
    /// when a render committed while mounted, the commit already fired it.
    fn settle_patched(&self, rendered: bool) -> Result<(), LifecycleError> {
        if self.is_destroyed() {
            return Ok(());
        }
        if rendered && self.is_mounted() {
            return Ok(());
        }
        self.inner
            .component
            .borrow_mut()
            .patched(self)
            .map_err(LifecycleError::Hook)
    }

    // ---- mount/unmount traversal ----------------------------------------

    /// Top-down pass marking every not-yet-mounted component whose live
    /// element is part of the document as mounted and firing its `mounted`
    /// hook, stopping below any node it does not mark (that subtree was
    /// handled by a previous pass, or is not attached).
    pub fn propagate_mounted(&self) -> Result<(), LifecycleError> {
        let mut result = Ok(());
        crate::walk(self, &mut |node| {
            if result.is_err() || node.is_mounted() || !node.is_started() {
                return Visit::Skip;
            }
            let connected = node
                .live_element()
                .map(|element| element.is_connected())
                .unwrap_or(false);
            let parent_mounted = node.parent().map(|p| p.is_mounted()).unwrap_or(true);
            if !connected || !parent_mounted {
                return Visit::Skip;
            }
            node.inner.meta.borrow_mut().is_mounted = true;
            trace!("component {} mounted", node.id());
            if let Err(err) = node.inner.component.borrow_mut().mounted(node) {
                result = Err(err);
                return Visit::Skip;
            }
            Visit::Descend
        });
        result.map_err(LifecycleError::Hook)
    }

    fn unmount_subtree(&self) -> Result<(), LifecycleError> {
        let mut result: Result<(), HookError> = Ok(());
        crate::walk(self, &mut |node| {
            if result.is_err() || !node.is_mounted() {
                return Visit::Skip;
            }
            if let Err(err) = node.inner.component.borrow_mut().will_unmount(node) {
                result = Err(err);
                return Visit::Skip;
            }
            node.inner.meta.borrow_mut().is_mounted = false;
            trace!("component {} unmounted", node.id());
            Visit::Descend
        });
        result.map_err(LifecycleError::Hook)
    }

    // ---- engine-facing helpers ------------------------------------------

    /// Called by template engines while rendering a parent: queues this
    /// child's start (first render) or props update into the parent's
    /// pending list so the parent's patch waits for it.
    pub fn render_as_child(&self, props: Props, ctx: &mut RenderContext) {
        let future: RenderFuture = if !self.is_started() {
            self.start()
        } else {
            self.update_props(props, ctx.force)
        };
        ctx.push_pending(future);
    }
}

impl AnchorLookup for ComponentNode {
    fn resolve(&self, id: ComponentId) -> Result<LiveElement, PatchError> {
        let child = self
            .child(id)
            .ok_or(PatchError::UnresolvedAnchor { id })?;
        child
            .materialize()?
            .ok_or(PatchError::UnresolvedAnchor { id })
    }
}

impl std::fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let meta = self.inner.meta.borrow();
        f.debug_struct("ComponentNode")
            .field("id", &self.inner.id)
            .field("started", &meta.is_started)
            .field("mounted", &meta.is_mounted)
            .field("destroyed", &meta.is_destroyed)
            .field("render_id", &meta.render_id)
            .finish()
    }
}
