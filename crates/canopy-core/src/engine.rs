//! External collaborator contracts: template engine and display-tree patcher.
//!
//! The core consumes the template engine through a single call,
//! `render(template, node, context) -> DisplayNode`, where the context
//! carries the pending child-render futures, the per-component handler
//! cache, and the force flag descendants must honor. The patcher is consumed
//! through `patch(target, next, anchors) -> LiveElement`; the diffing
//! algorithm inside it is explicitly out of scope here.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::collections::map::HashMap;
use crate::hash::hash_one;
use crate::{ComponentId, ComponentNode, DisplayNode, LifecycleError, LiveElement, PatchError, Value};

/// Stable identity of one event binding inside a template, used to reuse the
/// bound closure across renders instead of allocating a new one per render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey(pub u64);

impl HandlerKey {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Derives a key from a binding name with the crate's default hasher.
    pub fn from_name(name: &str) -> Self {
        Self(hash_one(&name))
    }
}

pub type Handler = Rc<dyn Fn(&Value)>;

/// Cache of event-handler closures, owned by the component's metadata and
/// handed to the engine on every render. Shared by handle.
#[derive(Clone, Default)]
pub struct HandlerCache {
    inner: Rc<RefCell<HashMap<HandlerKey, Handler>>>,
}

impl HandlerCache {
    pub fn get(&self, key: HandlerKey) -> Option<Handler> {
        self.inner.borrow().get(&key).cloned()
    }

    pub fn insert(&self, key: HandlerKey, handler: Handler) {
        self.inner.borrow_mut().insert(key, handler);
    }

    pub fn get_or_insert_with(&self, key: HandlerKey, make: impl FnOnce() -> Handler) -> Handler {
        let mut inner = self.inner.borrow_mut();
        inner.entry(key).or_insert_with(make).clone()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

pub type PendingRender = LocalBoxFuture<'static, Result<(), LifecycleError>>;

/// Context threaded through one template render.
pub struct RenderContext {
    /// Promises contributed by recursively-rendering children; the patch
    /// step waits on all of them.
    pub pending: Vec<PendingRender>,
    pub handlers: HandlerCache,
    /// When set, descendants re-render unconditionally (environment change).
    pub force: bool,
}

impl RenderContext {
    pub fn new(handlers: HandlerCache, force: bool) -> Self {
        Self {
            pending: Vec::new(),
            handlers,
            force,
        }
    }

    pub fn push_pending(&mut self, future: PendingRender) {
        self.pending.push(future);
    }
}

/// Turns a template plus a component instance into a display-tree node. The
/// engine may recursively instantiate and render child components,
/// registering them under the parent and appending their render futures to
/// the context.
pub trait TemplateEngine {
    fn render(
        &self,
        template: &str,
        node: &ComponentNode,
        ctx: &mut RenderContext,
    ) -> Result<DisplayNode, LifecycleError>;
}

/// What the patcher is applied against.
pub enum PatchTarget<'a> {
    /// First materialization: a freshly created host element.
    Fresh(&'a LiveElement),
    /// Subsequent patch against the previously committed node.
    Committed {
        element: &'a LiveElement,
        previous: &'a DisplayNode,
    },
}

/// Resolves an [`crate::DisplayKind::Anchor`] slot to the referenced child
/// component's live element, materializing it if needed.
pub trait AnchorLookup {
    fn resolve(&self, id: ComponentId) -> Result<LiveElement, PatchError>;
}

/// Applies a new display-tree node against the previous one, mutating the
/// live tree minimally and returning the new live root.
pub trait Patcher {
    fn patch(
        &self,
        target: PatchTarget<'_>,
        next: &DisplayNode,
        anchors: &dyn AnchorLookup,
    ) -> Result<LiveElement, PatchError>;
}
