//! The user-extensible component unit.
//!
//! A [`Component`] supplies the template reference and the lifecycle hooks;
//! props, state, and environment live on the owning [`ComponentNode`] so
//! framework bookkeeping can never collide with user fields. Hooks receive
//! the node handle and may read props/state/env through it; they must not
//! synchronously re-enter the same node's render pipeline; updates initiated
//! from a hook belong on the scheduler.

use futures::future::LocalBoxFuture;

use crate::{ComponentNode, HookError, Record};

/// Decides when an update triggers a re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Re-render on every accepted update.
    #[default]
    Always,
    /// Re-render only when at least one field actually changed value; a
    /// no-change update produces no render and no `patched` call.
    OnChange,
}

/// Returns true when the two records differ in any field (key set or value).
pub fn fields_differ(current: &Record, next: &Record) -> bool {
    if current.len() != next.len() {
        return true;
    }
    next.iter().any(|(key, value)| current.get(key) != Some(value))
}

pub trait Component: 'static {
    /// Name of the template the engine renders for this component.
    fn template(&self) -> &str;

    /// Pre-render hook, awaited before the first render. May await arbitrary
    /// operations; a failure propagates to the caller of `mount`.
    fn will_start(
        &mut self,
        node: &ComponentNode,
    ) -> LocalBoxFuture<'static, Result<(), HookError>> {
        let _ = node;
        Box::pin(std::future::ready(Ok(())))
    }

    /// The live element just became part of the displayed document.
    fn mounted(&mut self, node: &ComponentNode) -> Result<(), HookError> {
        let _ = node;
        Ok(())
    }

    /// About to patch the live element; pre-update display state is still
    /// readable. Not called for the very first render.
    fn will_patch(&mut self, node: &ComponentNode) -> Result<(), HookError> {
        let _ = node;
        Ok(())
    }

    /// An update settled, whether or not it committed a patch.
    fn patched(&mut self, node: &ComponentNode) -> Result<(), HookError> {
        let _ = node;
        Ok(())
    }

    /// About to detach from the document. Fired top-down over the mounted
    /// subtree before the live element is removed.
    fn will_unmount(&mut self, node: &ComponentNode) -> Result<(), HookError> {
        let _ = node;
        Ok(())
    }

    /// Terminal. All descendants have already been destroyed.
    fn destroyed(&mut self, node: &ComponentNode) -> Result<(), HookError> {
        let _ = node;
        Ok(())
    }

    fn update_policy(&self) -> UpdatePolicy {
        UpdatePolicy::Always
    }

    /// Whether replacing the current props with `next` warrants a render.
    /// Consulted by the props update path unless the update is forced.
    fn should_update(&self, current: &Record, next: &Record) -> bool {
        match self.update_policy() {
            UpdatePolicy::Always => true,
            UpdatePolicy::OnChange => fields_differ(current, next),
        }
    }
}
