//! Named command descriptors.
//!
//! A node's mutation surface beyond plain `set` is a registry of named
//! actions with a fixed handler signature: `(node, args) -> optional keyed
//! result | failure`. A keyed-object result is merged back into the node's
//! children; a failure lands on the error lane, never at the call site.

use crate::tree::node::Node;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by an action handler.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ActionFailure {
    pub message: String,
}

impl ActionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for ActionFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ActionFailure {
    fn from(message: String) -> Self {
        Self { message }
    }
}

/// What a handler produces: optionally a keyed object to merge into the
/// node's children.
pub type ActionResult = Result<Option<Value>, ActionFailure>;

pub type SyncHandler = Arc<dyn Fn(&Node, &[Value]) -> ActionResult + Send + Sync>;
pub type AsyncHandler =
    Arc<dyn Fn(Node, Vec<Value>) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// A registered handler. Synchronous handlers may also serve as watch
/// targets; asynchronous ones suspend only at their own await points.
#[derive(Clone)]
pub enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

/// One entry in a node's action registry.
#[derive(Clone)]
pub struct ActionDef {
    pub(crate) handler: Handler,
    pub(crate) transactional: bool,
}

impl ActionDef {
    pub fn sync(
        handler: impl Fn(&Node, &[Value]) -> ActionResult + Send + Sync + 'static,
        transactional: bool,
    ) -> Self {
        Self {
            handler: Handler::Sync(Arc::new(handler)),
            transactional,
        }
    }

    pub fn asynchronous(
        handler: impl Fn(Node, Vec<Value>) -> BoxFuture<'static, ActionResult>
            + Send
            + Sync
            + 'static,
        transactional: bool,
    ) -> Self {
        Self {
            handler: Handler::Async(Arc::new(handler)),
            transactional,
        }
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }
}

impl std::fmt::Debug for ActionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.handler {
            Handler::Sync(_) => "sync",
            Handler::Async(_) => "async",
        };
        f.debug_struct("ActionDef")
            .field("kind", &kind)
            .field("transactional", &self.transactional)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_render_their_message() {
        let failure = ActionFailure::new("bad scale value");
        assert_eq!(failure.to_string(), "bad scale value");
    }

    #[test]
    fn action_defs_report_their_shape() {
        let def = ActionDef::sync(|_, _| Ok(None), true);
        assert!(def.is_transactional());
        assert!(format!("{def:?}").contains("sync"));
    }
}
