//! Probe component recording every lifecycle hook.

use std::cell::RefCell;
use std::rc::Rc;

use canopy_core::{Component, ComponentNode, HookError, UpdatePolicy};
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;

/// Shared log of hook invocations, in firing order.
#[derive(Clone, Default)]
pub struct HookLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl HookLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut self.entries.borrow_mut())
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn count_of(&self, entry: &str) -> usize {
        self.entries.borrow().iter().filter(|e| *e == entry).count()
    }
}

/// Component whose hooks append `"{name}:{hook}"` to a [`HookLog`]. The
/// pre-render hook can be gated on a oneshot channel to model arbitrary
/// asynchronous work inside `will_start`.
pub struct Probe {
    name: String,
    template: String,
    log: HookLog,
    policy: UpdatePolicy,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl Probe {
    pub fn new(name: impl Into<String>, template: impl Into<String>, log: &HookLog) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            log: log.clone(),
            policy: UpdatePolicy::Always,
            gate: RefCell::new(None),
        }
    }

    /// Pure variant: updates re-render only when a field actually changed.
    pub fn pure(mut self) -> Self {
        self.policy = UpdatePolicy::OnChange;
        self
    }

    /// `will_start` will wait until the sender side fires (or errors if the
    /// sender is dropped).
    pub fn gated(self, gate: oneshot::Receiver<()>) -> Self {
        *self.gate.borrow_mut() = Some(gate);
        self
    }

    pub fn boxed(self) -> Box<dyn Component> {
        Box::new(self)
    }

    fn mark(&self, hook: &str) {
        self.log.push(format!("{}:{}", self.name, hook));
    }
}

impl Component for Probe {
    fn template(&self) -> &str {
        &self.template
    }

    fn will_start(
        &mut self,
        _node: &ComponentNode,
    ) -> LocalBoxFuture<'static, Result<(), HookError>> {
        self.mark("willStart");
        match self.gate.borrow_mut().take() {
            Some(gate) => Box::pin(async move {
                gate.await
                    .map_err(|_| HookError::new("willStart", "gate sender dropped"))
            }),
            None => Box::pin(std::future::ready(Ok(()))),
        }
    }

    fn mounted(&mut self, _node: &ComponentNode) -> Result<(), HookError> {
        self.mark("mounted");
        Ok(())
    }

    fn will_patch(&mut self, _node: &ComponentNode) -> Result<(), HookError> {
        self.mark("willPatch");
        Ok(())
    }

    fn patched(&mut self, _node: &ComponentNode) -> Result<(), HookError> {
        self.mark("patched");
        Ok(())
    }

    fn will_unmount(&mut self, _node: &ComponentNode) -> Result<(), HookError> {
        self.mark("willUnmount");
        Ok(())
    }

    fn destroyed(&mut self, _node: &ComponentNode) -> Result<(), HookError> {
        self.mark("destroyed");
        Ok(())
    }

    fn update_policy(&self) -> UpdatePolicy {
        self.policy
    }
}
