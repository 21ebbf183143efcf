//! Lifecycle and rendering-orchestration core for the Canopy component tree.
//!
//! Components form a rooted tree. Each [`ComponentNode`] owns a user
//! component (the [`Component`] trait object), its props/state/env cells, and
//! a private metadata record that drives the lifecycle state machine.
//! Rendering is asynchronous: the pre-render hook and child renders may await
//! arbitrary work, and a monotonically increasing render id is used as a
//! fencing token so that only the most recently requested render is ever
//! committed to the live tree.
//!
//! The template engine and the display-tree patcher are external
//! collaborators, consumed through the [`TemplateEngine`] and [`Patcher`]
//! traits.

extern crate self as canopy_core;

pub mod collections;
pub mod component;
pub mod dnode;
pub mod engine;
pub mod env;
pub mod error;
pub mod hash;
pub mod live;
pub mod node;
pub mod scheduler;
pub mod value;
pub mod walk;

pub use component::{fields_differ, Component, UpdatePolicy};
pub use dnode::{DisplayKind, DisplayNode};
pub use engine::{
    AnchorLookup, Handler, HandlerCache, HandlerKey, PatchTarget, Patcher, PendingRender,
    RenderContext, TemplateEngine,
};
pub use env::Env;
pub use error::{HookError, LifecycleError, PatchError};
pub use live::{LiveElement, WeakLiveElement};
pub use node::{ComponentNode, NodeRef, RenderFuture, RenderHandle, WeakComponentNode};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use value::{Props, Record, Value};
pub use walk::{walk, Visit};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique component identity, assigned at construction and never
/// reused. A child's key in its parent's child mapping always equals the
/// child's own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Draws the next id from the process-wide monotonic generator.
    pub fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
