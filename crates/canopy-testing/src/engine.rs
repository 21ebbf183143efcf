//! Closure-backed template engine.
//!
//! Templates are registered by name as closures from `(node, context)` to a
//! display node. Child components are managed through named slots: the first
//! render of a slot instantiates the child under the parent, subsequent
//! renders reuse it and queue a props update, mirroring how a real engine
//! keeps child identity stable across parent renders.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use canopy_core::{
    Component, ComponentId, ComponentNode, DisplayNode, LifecycleError, Props, RenderContext,
    TemplateEngine, WeakComponentNode,
};

pub type TemplateFn =
    Box<dyn Fn(&ComponentNode, &mut RenderContext) -> Result<DisplayNode, LifecycleError>>;

#[derive(Default)]
pub struct TestEngine {
    templates: RefCell<HashMap<String, TemplateFn>>,
    slots: RefCell<HashMap<(ComponentId, String), WeakComponentNode>>,
}

impl TestEngine {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        template: impl Fn(&ComponentNode, &mut RenderContext) -> Result<DisplayNode, LifecycleError>
            + 'static,
    ) {
        self.templates
            .borrow_mut()
            .insert(name.into(), Box::new(template));
    }

    /// Renders a child component into a named slot of `parent` and returns
    /// the anchor node marking its place in the parent's display tree. The
    /// child's start or props-update future is queued on the context so the
    /// parent's patch waits for it.
    pub fn child(
        &self,
        parent: &ComponentNode,
        slot: &str,
        props: Props,
        ctx: &mut RenderContext,
        create: impl FnOnce() -> Box<dyn Component>,
    ) -> DisplayNode {
        let key = (parent.id(), slot.to_string());
        let existing = self
            .slots
            .borrow()
            .get(&key)
            .and_then(|weak| weak.upgrade())
            .filter(|child| !child.is_destroyed());
        let child = match existing {
            Some(child) => child,
            None => {
                let child = ComponentNode::child_of(parent, create(), props.clone());
                self.slots.borrow_mut().insert(key, child.downgrade());
                child
            }
        };
        child.render_as_child(props, ctx);
        DisplayNode::anchor(child.id())
    }
}

impl TemplateEngine for TestEngine {
    fn render(
        &self,
        template: &str,
        node: &ComponentNode,
        ctx: &mut RenderContext,
    ) -> Result<DisplayNode, LifecycleError> {
        let templates = self.templates.borrow();
        let render = templates
            .get(template)
            .ok_or_else(|| LifecycleError::MissingTemplate {
                template: template.to_string(),
            })?;
        render(node, ctx)
    }
}
