//! Per-field watchers.
//!
//! A watcher fires synchronously on every successful update of one named
//! child, inside whatever transaction produced the update, so a derived
//! field it writes lands in the same broadcast as the change that triggered
//! it.

use crate::tree::node::Node;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// What a watcher sees: the child's name, its new value, and the value it
/// replaced.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WatchChange {
    pub name: String,
    pub value: Value,
    pub old_value: Value,
}

/// A watch target: a plain callback, or the name of a registered
/// synchronous action (invoked with the change as its single argument).
#[derive(Clone)]
pub enum WatchHandler {
    Callback(Arc<dyn Fn(&Node, &WatchChange) + Send + Sync>),
    Action(String),
}

impl WatchHandler {
    pub fn callback(handler: impl Fn(&Node, &WatchChange) + Send + Sync + 'static) -> Self {
        WatchHandler::Callback(Arc::new(handler))
    }
}

impl From<&str> for WatchHandler {
    fn from(action: &str) -> Self {
        WatchHandler::Action(action.to_string())
    }
}

impl From<String> for WatchHandler {
    fn from(action: String) -> Self {
        WatchHandler::Action(action)
    }
}

impl std::fmt::Debug for WatchHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchHandler::Callback(_) => f.write_str("Callback(..)"),
            WatchHandler::Action(name) => f.debug_tuple("Action").field(name).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn changes_serialize_for_action_handlers() {
        let change = WatchChange {
            name: "x".to_string(),
            value: json!(10),
            old_value: json!(0),
        };
        let encoded = serde_json::to_value(&change).unwrap();
        assert_eq!(encoded["name"], "x");
        assert_eq!(encoded["value"], 10);
        assert_eq!(encoded["old_value"], 0);
    }

    #[test]
    fn action_names_convert_into_handlers() {
        let handler: WatchHandler = "updateDist".into();
        match handler {
            WatchHandler::Action(name) => assert_eq!(name, "updateDist"),
            other => panic!("expected action handler, got {other:?}"),
        }
    }
}
