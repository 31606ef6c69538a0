//! Node storage.
//!
//! Nodes live in an arena addressed by stable [`NodeId`]s. A record owns an
//! ordered list of `(child name, child id)` pairs; the parent id it stores is
//! for lookup only, never for ownership or cleanup traversal. Records are
//! never removed, so an id stays valid for the life of the tree.

use crate::channel::{Relay, Subscription};
use crate::error::ErrorEvent;
use crate::tree::action::ActionDef;
use crate::tree::node::Node;
use crate::tree::status::StatusGate;
use crate::tree::validate::TypeSpec;
use crate::tree::watch::WatchHandler;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Stable identifier of a node within its tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u64);

/// What a node holds: nothing yet, a scalar, or named children. Scalar and
/// children are mutually exclusive; Empty exists only while the node is New.
#[derive(Debug)]
pub(crate) enum Content {
    Empty,
    Value(Value),
    Children(Vec<(String, NodeId)>),
}

impl Content {
    pub fn children(&self) -> Option<&[(String, NodeId)]> {
        match self {
            Content::Children(children) => Some(children),
            _ => None,
        }
    }
}

/// One registered watcher: the child key it follows, its handler, and the
/// last value it saw (used both for change suppression and as `old_value`).
pub(crate) struct WatchEntry {
    pub key: String,
    pub handler: WatchHandler,
    pub baseline: Value,
}

/// The forwarding link from one child's channel into the parent: value
/// rebroadcast plus wrapped error forwarding. Dropping it severs both.
pub(crate) struct ChildLink {
    pub _values: Subscription,
    pub _errors: Subscription,
}

pub(crate) struct NodeRecord {
    pub name: String,
    pub gate: StatusGate,
    pub ty: Option<TypeSpec>,
    pub content: Content,
    pub parent: Option<NodeId>,
    pub actions: HashMap<String, ActionDef>,
    pub watchers: Vec<WatchEntry>,
    pub relay: Relay<Node, ErrorEvent>,
    pub links: HashMap<String, ChildLink>,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            gate: StatusGate::new(),
            ty: None,
            content: Content::Empty,
            parent,
            actions: HashMap::new(),
            watchers: Vec::new(),
            relay: Relay::new(),
            links: HashMap::new(),
        }
    }
}

pub(crate) struct Arena {
    nodes: HashMap<NodeId, NodeRecord>,
    next: u64,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next: 0,
        }
    }

    pub fn insert(&mut self, record: NodeRecord) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, record);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeRecord> {
        self.nodes.get_mut(&id)
    }

    /// Resolve a child id by name under `parent`.
    pub fn child_id(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.get(parent)?
            .content
            .children()?
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, id)| *id)
    }

    /// Deep plain-data snapshot of a subtree: a leaf yields its scalar (Null
    /// while still empty), a branch yields an object of its children's
    /// snapshots.
    pub fn snapshot(&self, id: NodeId) -> Value {
        match self.get(id).map(|record| &record.content) {
            Some(Content::Value(value)) => value.clone(),
            Some(Content::Children(children)) => {
                let mut out = serde_json::Map::new();
                for (name, child) in children {
                    out.insert(name.clone(), self.snapshot(*child));
                }
                Value::Object(out)
            }
            Some(Content::Empty) | None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_stable_and_sequential() {
        let mut arena = Arena::new();
        let a = arena.insert(NodeRecord::new("a", None));
        let b = arena.insert(NodeRecord::new("b", Some(a)));
        assert_ne!(a, b);
        assert_eq!(arena.get(b).unwrap().parent, Some(a));
    }

    #[test]
    fn snapshot_flattens_nested_children() {
        let mut arena = Arena::new();
        let root = arena.insert(NodeRecord::new("root", None));
        let pos = arena.insert(NodeRecord::new("pos", Some(root)));
        let x = arena.insert(NodeRecord::new("x", Some(pos)));

        arena.get_mut(x).unwrap().content = Content::Value(json!(4));
        arena.get_mut(pos).unwrap().content = Content::Children(vec![("x".to_string(), x)]);
        arena.get_mut(root).unwrap().content = Content::Children(vec![("pos".to_string(), pos)]);

        assert_eq!(arena.snapshot(root), json!({"pos": {"x": 4}}));
        assert_eq!(arena.child_id(root, "pos"), Some(pos));
        assert_eq!(arena.child_id(root, "x"), None);
    }

    #[test]
    fn empty_nodes_snapshot_as_null() {
        let mut arena = Arena::new();
        let root = arena.insert(NodeRecord::new("root", None));
        assert_eq!(arena.snapshot(root), Value::Null);
    }
}
