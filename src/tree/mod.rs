//! The reactive node tree.
//!
//! A tree is a recursive structure of named [`Node`]s, each holding either a
//! typed scalar or an ordered set of children — never both. Mutations run
//! inside transactions that coalesce into a single broadcast; per-field
//! watchers recompute derived values synchronously inside the same update;
//! projections ([`Node::filter`]) derive change-suppressed read-only views.
//! Faults travel a dedicated error lane so value subscribers never see them.

mod action;
mod arena;
mod builder;
mod node;
mod projection;
mod status;
mod validate;
mod watch;

pub use action::{ActionFailure, ActionResult};
pub use arena::NodeId;
pub use builder::{ChildSpec, NodeBuilder};
pub use node::Node;
pub use projection::Projection;
pub use status::{NodeStatus, StatusError, StatusGate};
pub use validate::{TypeSpec, TypeTag};
pub use watch::{WatchChange, WatchHandler};
