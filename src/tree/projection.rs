//! Field projections.
//!
//! [`Node::filter`] derives a read-only view over a subset of a branch's
//! fields. The projection replays its latest selection to new subscribers
//! and emits only when at least one selected field's value actually changed,
//! so updates to unrelated fields are suppressed.

use crate::channel::{Relay, Subscription};
use crate::error::{ErrorEvent, TreeError};
use crate::tree::node::Node;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// A read-only observable over a fixed set of fields.
pub struct Projection {
    relay: Relay<Value, ErrorEvent>,
    _value_link: Subscription,
    _complete_link: Subscription,
}

impl Projection {
    /// Subscribe to selection snapshots. The current selection is replayed
    /// immediately.
    pub fn subscribe(&self, callback: impl Fn(&Value) + Send + Sync + 'static) -> Subscription {
        self.relay.subscribe(callback)
    }

    /// Subscribe to the completion signal, forwarded from the source node.
    pub fn subscribe_complete(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.relay.subscribe_complete(callback)
    }

    /// The latest selection snapshot.
    pub fn last(&self) -> Option<Value> {
        self.relay.last()
    }
}

impl Node {
    /// Derive a read-only projection of the named fields.
    ///
    /// Structural equality on the selected snapshot decides whether a source
    /// broadcast reaches projection subscribers: a change confined to
    /// unrelated fields emits nothing.
    pub fn filter(&self, fields: &[&str]) -> Result<Projection, TreeError> {
        let fields: Vec<String> = fields.iter().map(|field| field.to_string()).collect();
        let select = move |node: &Node| -> Value {
            let snapshot = node.values();
            let mut out = serde_json::Map::new();
            for field in &fields {
                if let Some(value) = snapshot.get(field) {
                    out.insert(field.clone(), value.clone());
                }
            }
            Value::Object(out)
        };

        let initial = select(self);
        let relay: Relay<Value, ErrorEvent> = Relay::seeded(initial.clone());
        let previous = Arc::new(Mutex::new(initial));

        let out = relay.clone();
        let value_link = self.subscribe(move |node| {
            let current = select(node);
            let mut previous = previous.lock().unwrap();
            if *previous != current {
                *previous = current.clone();
                out.emit(current);
            }
        })?;

        let done = relay.clone();
        let complete_link = self.subscribe_complete(move || done.complete())?;

        Ok(Projection {
            relay,
            _value_link: value_link,
            _complete_link: complete_link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    fn person() -> Node {
        Node::build("person")
            .child("age", json!(50))
            .child("name", json!("Bob"))
            .child("height", json!(70))
            .child("weight", json!(200))
            .finish()
            .unwrap()
    }

    fn watch(projection: &Projection) -> (Arc<StdMutex<Vec<Value>>>, Subscription) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = projection.subscribe(move |v| sink.lock().unwrap().push(v.clone()));
        (seen, sub)
    }

    #[tokio::test]
    async fn projections_replay_and_suppress_unrelated_changes() {
        let node = person();
        let projection = node.filter(&["name", "age"]).unwrap();
        let (seen, _sub) = watch(&projection);

        assert_eq!(*seen.lock().unwrap(), vec![json!({"name": "Bob", "age": 50})]);

        // An unrelated field changes: the projection stays quiet.
        node.act("setHeight", vec![json!(69)]).await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);

        // A selected field changes: one emission.
        node.act("setAge", vec![json!(51)]).await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                json!({"name": "Bob", "age": 50}),
                json!({"name": "Bob", "age": 51}),
            ]
        );
    }

    #[test]
    fn rewriting_the_same_value_emits_nothing() {
        let node = person();
        let projection = node.filter(&["age"]).unwrap();
        let (seen, _sub) = watch(&projection);

        node.set_field("age", json!(50)).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn unknown_fields_are_simply_absent_from_the_selection() {
        let node = person();
        let projection = node.filter(&["age", "shoe_size"]).unwrap();
        assert_eq!(projection.last(), Some(json!({"age": 50})));
    }

    #[test]
    fn projection_completes_with_its_source() {
        let node = person();
        let projection = node.filter(&["age"]).unwrap();
        let fired = Arc::new(StdMutex::new(0));
        let counter = Arc::clone(&fired);
        let _done = projection.subscribe_complete(move || *counter.lock().unwrap() += 1);

        node.complete().unwrap();
        assert_eq!(*fired.lock().unwrap(), 1);
    }

    #[test]
    fn filtering_a_closed_node_fails() {
        let node = person();
        node.complete().unwrap();
        assert!(node.filter(&["age"]).is_err());
    }
}
