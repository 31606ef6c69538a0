//! Node lifecycle status.
//!
//! Every node moves through New → Active → Transacting ⇄ Active → Closed.
//! The legal moves are expressed through the machine engine's exit-set
//! primitive ([`Exits`]) rather than a parallel hand-rolled check, so the
//! tree's lifecycle and the state-machine engine share one guarded-transition
//! core.

use crate::machine::Exits;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Constructed, but no value or child yet.
    New,
    /// Holding state and broadcasting.
    Active,
    /// Inside a transaction; broadcasts are suppressed.
    Transacting,
    /// Terminal. No further mutation or subscription.
    Closed,
}

impl NodeStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Transacting => "transacting",
            Self::Closed => "closed",
        }
    }
}

/// A status move the lifecycle table does not permit.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("node status cannot move from {from:?} to {to:?}")]
pub struct StatusError {
    pub from: NodeStatus,
    pub to: NodeStatus,
}

/// Guarded holder of one node's status.
#[derive(Clone, Debug)]
pub struct StatusGate {
    current: NodeStatus,
}

impl Default for StatusGate {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusGate {
    pub fn new() -> Self {
        Self {
            current: NodeStatus::New,
        }
    }

    pub fn current(&self) -> NodeStatus {
        self.current
    }

    pub fn is(&self, status: NodeStatus) -> bool {
        self.current == status
    }

    /// The exit set out of a status. Transacting may re-enter itself so
    /// transactions nest; Closed has no exits.
    fn exits(from: NodeStatus) -> Exits<NodeStatus> {
        match from {
            NodeStatus::New => Exits::only([
                NodeStatus::Active,
                NodeStatus::Transacting,
                NodeStatus::Closed,
            ]),
            NodeStatus::Active => Exits::only([NodeStatus::Transacting, NodeStatus::Closed]),
            NodeStatus::Transacting => Exits::only([
                NodeStatus::New,
                NodeStatus::Active,
                NodeStatus::Transacting,
                NodeStatus::Closed,
            ]),
            NodeStatus::Closed => Exits::none(),
        }
    }

    pub fn can_go(&self, to: NodeStatus) -> bool {
        Self::exits(self.current).contains(&to)
    }

    /// Move to `to`, returning the prior status.
    pub fn go(&mut self, to: NodeStatus) -> Result<NodeStatus, StatusError> {
        if !self.can_go(to) {
            return Err(StatusError {
                from: self.current,
                to,
            });
        }
        let prior = self.current;
        self.current = to;
        Ok(prior)
    }

    /// Advance New → Active. Any other current status is left alone; this is
    /// the automatic promotion that fires once a node first holds a value or
    /// a child.
    pub fn activate(&mut self) {
        if self.current == NodeStatus::New {
            self.current = NodeStatus::Active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_start_new() {
        let gate = StatusGate::new();
        assert_eq!(gate.current(), NodeStatus::New);
    }

    #[test]
    fn activate_only_promotes_new_nodes() {
        let mut gate = StatusGate::new();
        gate.activate();
        assert_eq!(gate.current(), NodeStatus::Active);

        gate.go(NodeStatus::Closed).unwrap();
        gate.activate();
        assert_eq!(gate.current(), NodeStatus::Closed);
    }

    #[test]
    fn transactions_enter_and_exit_symmetrically() {
        let mut gate = StatusGate::new();
        gate.activate();

        let prior = gate.go(NodeStatus::Transacting).unwrap();
        assert_eq!(prior, NodeStatus::Active);
        assert_eq!(gate.current(), NodeStatus::Transacting);

        gate.go(prior).unwrap();
        assert_eq!(gate.current(), NodeStatus::Active);
    }

    #[test]
    fn transactions_nest() {
        let mut gate = StatusGate::new();
        gate.activate();
        gate.go(NodeStatus::Transacting).unwrap();
        let prior = gate.go(NodeStatus::Transacting).unwrap();
        assert_eq!(prior, NodeStatus::Transacting);
    }

    #[test]
    fn closed_is_terminal() {
        let mut gate = StatusGate::new();
        gate.activate();
        gate.go(NodeStatus::Closed).unwrap();

        for target in [
            NodeStatus::New,
            NodeStatus::Active,
            NodeStatus::Transacting,
            NodeStatus::Closed,
        ] {
            assert!(!gate.can_go(target));
            assert!(gate.go(target).is_err());
        }
    }

    #[test]
    fn active_cannot_regress_to_new() {
        let mut gate = StatusGate::new();
        gate.activate();
        assert!(gate.go(NodeStatus::New).is_err());
    }
}
