//! Testing utilities and harness for the Canopy lifecycle core.
//!
//! The core treats the template engine and the display-tree patcher as
//! external collaborators; this crate supplies deliberately simple stand-ins
//! (a closure-backed [`TestEngine`] and a replace-everything
//! [`ReplacePatcher`]) plus a [`TestShell`] that owns a scheduler and a
//! document root, and a [`Probe`] component that records every lifecycle
//! hook it sees.

pub mod engine;
pub mod patcher;
pub mod probe;
pub mod shell;

pub use engine::{TemplateFn, TestEngine};
pub use patcher::ReplacePatcher;
pub use probe::{HookLog, Probe};
pub use shell::TestShell;

pub mod prelude {
    pub use crate::engine::TestEngine;
    pub use crate::patcher::ReplacePatcher;
    pub use crate::probe::{HookLog, Probe};
    pub use crate::shell::TestShell;
}
