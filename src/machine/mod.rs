//! Guarded finite-state-machine engine.
//!
//! A [`Machine`] holds a named set of states, the legal exits between them,
//! and at most one in-flight transition at a time. Transitions either commit
//! immediately ([`Machine::go`]) or wait on an external gate
//! ([`Machine::go_when`]), and named actions resolve to destination states or
//! handlers ([`Machine::dispatch`]).
//!
//! The exit-set primitive ([`Exits`]) is shared with the node tree's status
//! lifecycle, so both express the same guarded-transition concept.

mod builder;
mod exits;
mod history;
#[allow(clippy::module_inception)]
mod machine;
mod state;

pub use builder::{BuildError, MachineBuilder};
pub use exits::{Exits, StateSel};
pub use history::{History, TransitionRecord};
pub use machine::{
    ActionTarget, Machine, MachineHandler, Pending, ReachReport, TransitionError,
    TransitionSnapshot,
};
pub use state::StateDef;
