//! Error types for the node tree.
//!
//! Two disjoint families, matching how each kind of failure reaches the
//! caller:
//!
//! - [`TreeError`] values are programmer errors (operating on a closed node,
//!   redefining a child or action). They are raised synchronously from the
//!   call site and never travel through a channel.
//! - [`ErrorEvent`] values are expected, recoverable runtime conditions
//!   (a value failing its type check, an unknown child key). They are
//!   delivered on a node's error lane and never abort the calling operation.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Lifecycle and configuration errors, raised synchronously.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node '{node}' is closed")]
    Closed { node: String },

    #[error("node '{node}' already has a child '{key}'")]
    DuplicateChild { node: String, key: String },

    #[error("node '{node}' already has an action '{name}'")]
    DuplicateAction { node: String, name: String },

    #[error("node '{node}' has no action '{name}'")]
    UnknownAction { node: String, name: String },

    #[error("cannot set a scalar value on branch node '{node}'")]
    ValueOnBranch { node: String },

    #[error("node name must not be empty")]
    EmptyName,

    #[error("unknown type tag '{tag}'")]
    UnknownType { tag: String },
}

/// Events carried by a node's error lane.
///
/// These never pass through the value lane, so subscribers watching state
/// changes are isolated from faults.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorEvent {
    /// A value failed a leaf's type constraint. The assignment did not
    /// happen; `value` is the rejected candidate.
    Validation {
        name: String,
        message: String,
        value: Value,
        expected: String,
    },

    /// An operation named a child key the node does not have.
    ChildLookup { node: String, key: String },

    /// An error emitted by a child, re-wrapped onto the parent's lane.
    #[serde(rename = "child error")]
    Child { key: String, error: Box<ErrorEvent> },

    /// An action handler reported failure.
    Action { action: String, message: String },

    /// A transaction body failed. Mutations applied before the failure
    /// point remain in place.
    Transaction { message: String },
}

impl ErrorEvent {
    /// Wrap an event as a child error under the given key.
    pub fn into_child(self, key: impl Into<String>) -> ErrorEvent {
        ErrorEvent::Child {
            key: key.into(),
            error: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tree_errors_render_the_node_name() {
        let err = TreeError::Closed {
            node: "profile".to_string(),
        };
        assert_eq!(err.to_string(), "node 'profile' is closed");
    }

    #[test]
    fn validation_event_serializes_with_tag() {
        let event = ErrorEvent::Validation {
            name: "age".to_string(),
            message: "bad set attempt".to_string(),
            value: json!("Flanders"),
            expected: "number".to_string(),
        };
        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["type"], "validation");
        assert_eq!(encoded["value"], "Flanders");
    }

    #[test]
    fn child_wrapping_nests_the_source_event() {
        let inner = ErrorEvent::ChildLookup {
            node: "coord".to_string(),
            key: "z".to_string(),
        };
        let wrapped = inner.clone().into_child("coord");
        match wrapped {
            ErrorEvent::Child { key, error } => {
                assert_eq!(key, "coord");
                assert_eq!(*error, inner);
            }
            other => panic!("expected child wrapper, got {other:?}"),
        }
    }

    #[test]
    fn child_event_tag_is_the_wrapped_form() {
        let wrapped = ErrorEvent::ChildLookup {
            node: "coord".to_string(),
            key: "z".to_string(),
        }
        .into_child("coord");
        let encoded = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(encoded["type"], "child error");
        assert_eq!(encoded["key"], "coord");
    }
}
