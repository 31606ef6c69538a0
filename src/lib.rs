//! Treestate: guarded state machines and a reactive node tree.
//!
//! Two tightly related primitives for building reactive application state:
//!
//! - [`Machine`] — a guarded finite-state machine: named states, legal
//!   transitions between them, actions resolving to destinations or
//!   handlers, and in-flight transitions that may await an external gate
//!   before committing.
//! - [`Node`] — a hierarchical reactive value store: each node holds either
//!   a typed scalar or named children, with transactional batched mutation,
//!   per-field watchers for derived values, change-suppressed projections,
//!   and replay-latest multicast notification with a separate error lane.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use treestate::{Machine, Node};
//!
//! // A stoplight that cycles on an 'advance' action.
//! let light = Machine::new("stoplight", ["red", "yellow", "green"], "red").unwrap();
//! light.add_action("advance", "red", "green").unwrap();
//! light.add_action("advance", "green", "yellow").unwrap();
//! light.add_action("advance", "yellow", "red").unwrap();
//! light.dispatch("advance", &[]).unwrap();
//! assert_eq!(light.state(), "green");
//!
//! // A branch node: one broadcast per mutation session, however many
//! // fields it touched.
//! let person = Node::build("person")
//!     .child("age", json!(50))
//!     .child("name", json!("Bob"))
//!     .finish()
//!     .unwrap();
//! person.set_field("age", json!(45)).unwrap();
//! assert_eq!(person.values(), json!({"age": 45, "name": "Bob"}));
//! ```

pub mod channel;
pub mod error;
pub mod machine;
pub mod tree;

pub use channel::{Relay, Subscription};
pub use error::{ErrorEvent, TreeError};
pub use machine::{
    ActionTarget, BuildError, Exits, History, Machine, MachineBuilder, Pending, ReachReport,
    StateDef, StateSel, TransitionError, TransitionRecord, TransitionSnapshot,
};
pub use tree::{
    ActionFailure, ActionResult, ChildSpec, Node, NodeBuilder, NodeStatus, Projection, TypeSpec,
    TypeTag, WatchChange, WatchHandler,
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_two_primitives_compose() {
        let machine = Machine::new("lifecycle", ["running", "stopped"], "running").unwrap();
        let store = Node::leaf("count", json!(0)).unwrap();

        store.set(json!(1)).unwrap();
        machine.go("stopped").unwrap();

        assert_eq!(store.value(), Some(json!(1)));
        assert_eq!(machine.state(), "stopped");
    }
}
