//! Error types surfaced by the lifecycle core.
//!
//! Stale renders and post-destruction operations are not errors: both are
//! silent no-ops. What does surface is user hook failure, template engine
//! failure, and patcher failure, always through the promise chain of the
//! triggering call; the core performs no implicit retry.

use std::fmt;
use std::rc::Rc;

use crate::ComponentId;

/// Failure raised by a user lifecycle hook. The core never catches it; the
/// component is left in whatever state it reached and callers should treat
/// it as unusable.
#[derive(Debug, Clone)]
pub struct HookError {
    hook: &'static str,
    message: String,
    source: Option<Rc<dyn std::error::Error>>,
}

impl HookError {
    pub fn new(hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            hook,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        hook: &'static str,
        message: impl Into<String>,
        source: Rc<dyn std::error::Error>,
    ) -> Self {
        Self {
            hook,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn hook(&self) -> &'static str {
        self.hook
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hook failed: {}", self.hook, self.message)
    }
}

impl std::error::Error for HookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref()
    }
}

/// Failure applying a display-tree node against the live tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    UnresolvedAnchor { id: ComponentId },
    TargetMismatch { expected: &'static str },
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::UnresolvedAnchor { id } => {
                write!(f, "anchor {id} does not resolve to a live child")
            }
            PatchError::TargetMismatch { expected } => {
                write!(f, "patch target mismatch; expected {expected}")
            }
        }
    }
}

impl std::error::Error for PatchError {}

/// Errors produced by the render pipeline and mount path. `Clone` because
/// the in-flight render handle is shared between de-duplicated updates.
#[derive(Debug, Clone)]
pub enum LifecycleError {
    MissingTemplate { template: String },
    Template { message: String },
    Hook(HookError),
    Patch(PatchError),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::MissingTemplate { template } => {
                write!(f, "template {template:?} is not registered")
            }
            LifecycleError::Template { message } => {
                write!(f, "template engine failed: {message}")
            }
            LifecycleError::Hook(err) => write!(f, "{err}"),
            LifecycleError::Patch(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifecycleError::Hook(err) => Some(err),
            LifecycleError::Patch(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HookError> for LifecycleError {
    fn from(err: HookError) -> Self {
        LifecycleError::Hook(err)
    }
}

impl From<PatchError> for LifecycleError {
    fn from(err: PatchError) -> Self {
        LifecycleError::Patch(err)
    }
}
