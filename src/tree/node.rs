//! The reactive node handle.
//!
//! A [`Node`] is a cheap clonable handle into a tree's arena. Reads take a
//! point-in-time snapshot; writes run inside transactions that coalesce any
//! number of internal mutations into exactly one broadcast. The broadcast
//! channel carries the node handle itself, so a subscriber can read
//! [`Node::value`] or [`Node::values`] at notification time, and replays the
//! latest emission to late subscribers.

use crate::channel::Subscription;
use crate::error::{ErrorEvent, TreeError};
use crate::tree::action::{ActionDef, ActionFailure, ActionResult, Handler};
use crate::tree::arena::{Arena, ChildLink, Content, NodeId, NodeRecord, WatchEntry};
use crate::tree::builder::NodeBuilder;
use crate::tree::status::NodeStatus;
use crate::tree::validate::TypeSpec;
use crate::tree::watch::{WatchChange, WatchHandler};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Handle to one node of a reactive tree.
#[derive(Clone)]
pub struct Node {
    arena: Arc<Mutex<Arena>>,
    id: NodeId,
}

// Records are inserted at construction and never removed, so a handle's id
// always resolves.
fn record_ref(arena: &Arena, id: NodeId) -> &NodeRecord {
    arena.get(id).expect("node records are never removed")
}

fn record_mut(arena: &mut Arena, id: NodeId) -> &mut NodeRecord {
    arena.get_mut(id).expect("node records are never removed")
}

fn cap_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

impl Node {
    pub(crate) fn from_arena(arena: Arc<Mutex<Arena>>, id: NodeId) -> Self {
        Self { arena, id }
    }

    /// A named node with no value yet: status New until the first value or
    /// child arrives.
    pub fn new(name: &str) -> Result<Self, TreeError> {
        if name.is_empty() {
            return Err(TreeError::EmptyName);
        }
        let mut arena = Arena::new();
        let id = arena.insert(NodeRecord::new(name, None));
        Ok(Self {
            arena: Arc::new(Mutex::new(arena)),
            id,
        })
    }

    /// A leaf holding an initial scalar.
    pub fn leaf(name: &str, value: impl Into<Value>) -> Result<Self, TreeError> {
        let node = Self::new(name)?;
        node.set_initial(value.into());
        Ok(node)
    }

    /// A typed leaf. The initial value is applied as-is; the constraint
    /// guards subsequent assignments.
    pub fn leaf_typed(
        name: &str,
        value: impl Into<Value>,
        ty: impl Into<TypeSpec>,
    ) -> Result<Self, TreeError> {
        let node = Self::new(name)?;
        node.set_type(ty.into());
        node.set_initial(value.into());
        Ok(node)
    }

    /// Fluent construction of a node with children, actions, and watchers.
    pub fn build(name: &str) -> NodeBuilder {
        NodeBuilder::new(name)
    }

    // ---- reads ------------------------------------------------------------

    pub fn name(&self) -> String {
        let arena = self.arena.lock().unwrap();
        record_ref(&arena, self.id).name.clone()
    }

    pub fn status(&self) -> NodeStatus {
        let arena = self.arena.lock().unwrap();
        record_ref(&arena, self.id).gate.current()
    }

    pub fn is_new(&self) -> bool {
        self.status() == NodeStatus::New
    }

    pub fn is_active(&self) -> bool {
        self.status() == NodeStatus::Active
    }

    pub fn is_transacting(&self) -> bool {
        self.status() == NodeStatus::Transacting
    }

    pub fn is_closed(&self) -> bool {
        self.status() == NodeStatus::Closed
    }

    /// The leaf scalar. `None` while the node is empty, and `None` on a
    /// branch — a branch's data reading is [`Node::values`], its structural
    /// reading [`Node::children`].
    pub fn value(&self) -> Option<Value> {
        let arena = self.arena.lock().unwrap();
        match &record_ref(&arena, self.id).content {
            Content::Value(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Deep plain-data snapshot: a leaf's scalar, or a nested object with
    /// one level of node indirection removed per level of the tree.
    pub fn values(&self) -> Value {
        let arena = self.arena.lock().unwrap();
        arena.snapshot(self.id)
    }

    pub fn has_value(&self) -> bool {
        let arena = self.arena.lock().unwrap();
        matches!(record_ref(&arena, self.id).content, Content::Value(_))
    }

    pub fn has_children(&self) -> bool {
        let arena = self.arena.lock().unwrap();
        record_ref(&arena, self.id).content.children().is_some()
    }

    pub fn has(&self, key: &str) -> bool {
        let arena = self.arena.lock().unwrap();
        arena.child_id(self.id, key).is_some()
    }

    /// The structural keyed view: child handles in insertion order.
    pub fn children(&self) -> Vec<(String, Node)> {
        let arena = self.arena.lock().unwrap();
        record_ref(&arena, self.id)
            .content
            .children()
            .map(|children| {
                children
                    .iter()
                    .map(|(name, id)| {
                        (name.clone(), Node::from_arena(Arc::clone(&self.arena), *id))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A child handle by name.
    pub fn child(&self, key: &str) -> Option<Node> {
        let arena = self.arena.lock().unwrap();
        arena
            .child_id(self.id, key)
            .map(|id| Node::from_arena(Arc::clone(&self.arena), id))
    }

    /// A child's snapshot value. An unknown key is absorbed: it returns
    /// `None` and logs.
    pub fn get(&self, key: &str) -> Option<Value> {
        let arena = self.arena.lock().unwrap();
        match arena.child_id(self.id, key) {
            Some(id) => Some(arena.snapshot(id)),
            None => {
                let name = &record_ref(&arena, self.id).name;
                tracing::warn!(node = %name, key, "get on unknown child key");
                None
            }
        }
    }

    pub fn parent(&self) -> Option<Node> {
        let arena = self.arena.lock().unwrap();
        record_ref(&arena, self.id)
            .parent
            .map(|id| Node::from_arena(Arc::clone(&self.arena), id))
    }

    /// Registered action names, sorted.
    pub fn action_names(&self) -> Vec<String> {
        let arena = self.arena.lock().unwrap();
        let mut names: Vec<String> = record_ref(&arena, self.id).actions.keys().cloned().collect();
        names.sort();
        names
    }

    // ---- writes -----------------------------------------------------------

    /// Assign the leaf scalar.
    ///
    /// A value failing the node's type constraint does not mutate state: it
    /// emits one [`ErrorEvent::Validation`] on the error lane and the value
    /// lane stays untouched. Calling this on a branch is a programmer error.
    pub fn set(&self, value: impl Into<Value>) -> Result<(), TreeError> {
        let value = value.into();
        let rejected = {
            let mut arena = self.arena.lock().unwrap();
            let record = record_mut(&mut arena, self.id);
            if record.gate.is(NodeStatus::Closed) {
                return Err(TreeError::Closed {
                    node: record.name.clone(),
                });
            }
            if record.content.children().is_some() {
                return Err(TreeError::ValueOnBranch {
                    node: record.name.clone(),
                });
            }
            let valid = record.ty.as_ref().map(|t| t.check(&value)).unwrap_or(true);
            if valid {
                record.content = Content::Value(value);
                record.gate.activate();
                None
            } else {
                let expected = record
                    .ty
                    .as_ref()
                    .map(|t| t.name().to_string())
                    .unwrap_or_default();
                Some(ErrorEvent::Validation {
                    name: record.name.clone(),
                    message: "bad set attempt".to_string(),
                    value,
                    expected,
                })
            }
        };
        match rejected {
            None => self.broadcast(),
            Some(event) => self.emit_error(event),
        }
        Ok(())
    }

    /// Update one named child inside a single transaction (one broadcast).
    /// An unknown key is absorbed as an [`ErrorEvent::ChildLookup`].
    pub fn set_field(&self, key: &str, value: impl Into<Value>) -> Result<(), TreeError> {
        let key = key.to_string();
        let value = value.into();
        self.transact_sync(move |node| {
            node.update_child(&key, value);
            Ok(())
        })
    }

    /// Update any number of named children inside a single transaction.
    /// Regardless of pair count, subscribers see exactly one broadcast.
    pub fn set_fields(
        &self,
        pairs: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<(), TreeError> {
        let pairs: Vec<(String, Value)> = pairs.into_iter().collect();
        self.transact_sync(move |node| {
            for (key, value) in pairs {
                node.update_child(&key, value);
            }
            Ok(())
        })
    }

    /// Register a leaf child holding `value`. Wires the forwarding link from
    /// the child's channel and installs the auto-generated
    /// `set<CapitalizedName>` action. The first child permanently converts
    /// the node into a branch, purging any scalar value and type.
    pub fn add_child(&self, key: &str, value: impl Into<Value>) -> Result<Node, TreeError> {
        self.add_child_record(key, Some(value.into()), None)
    }

    /// Like [`Node::add_child`] with a type constraint on the new leaf.
    pub fn add_child_typed(
        &self,
        key: &str,
        value: impl Into<Value>,
        ty: impl Into<TypeSpec>,
    ) -> Result<Node, TreeError> {
        self.add_child_record(key, Some(value.into()), Some(ty.into()))
    }

    /// Register an empty child to hang further children from.
    pub fn add_branch(&self, key: &str) -> Result<Node, TreeError> {
        self.add_child_record(key, None, None)
    }

    // ---- actions ----------------------------------------------------------

    /// Register a synchronous action. If its result resolves to a keyed
    /// object, the object is merged into the node's children.
    pub fn add_action(
        &self,
        name: &str,
        handler: impl Fn(&Node, &[Value]) -> ActionResult + Send + Sync + 'static,
    ) -> Result<(), TreeError> {
        self.install_action(name, ActionDef::sync(handler, false))
    }

    /// Register a synchronous action whose whole run (body plus result
    /// merge) is one transaction: one broadcast, failures on the error lane.
    pub fn add_action_transactional(
        &self,
        name: &str,
        handler: impl Fn(&Node, &[Value]) -> ActionResult + Send + Sync + 'static,
    ) -> Result<(), TreeError> {
        self.install_action(name, ActionDef::sync(handler, true))
    }

    /// Register an asynchronous action.
    pub fn add_action_async(
        &self,
        name: &str,
        handler: impl Fn(Node, Vec<Value>) -> BoxFuture<'static, ActionResult>
            + Send
            + Sync
            + 'static,
    ) -> Result<(), TreeError> {
        self.install_action(name, ActionDef::asynchronous(handler, false))
    }

    /// Register an asynchronous transactional action.
    pub fn add_action_async_transactional(
        &self,
        name: &str,
        handler: impl Fn(Node, Vec<Value>) -> BoxFuture<'static, ActionResult>
            + Send
            + Sync
            + 'static,
    ) -> Result<(), TreeError> {
        self.install_action(name, ActionDef::asynchronous(handler, true))
    }

    pub(crate) fn install_action(&self, name: &str, def: ActionDef) -> Result<(), TreeError> {
        let mut arena = self.arena.lock().unwrap();
        let record = record_mut(&mut arena, self.id);
        if record.gate.is(NodeStatus::Closed) {
            return Err(TreeError::Closed {
                node: record.name.clone(),
            });
        }
        if record.actions.contains_key(name) {
            return Err(TreeError::DuplicateAction {
                node: record.name.clone(),
                name: name.to_string(),
            });
        }
        record.actions.insert(name.to_string(), def);
        Ok(())
    }

    /// Run a registered action.
    ///
    /// Handler failures are captured as [`ErrorEvent::Action`] on the error
    /// lane; the call itself only fails for lifecycle reasons (closed node,
    /// unknown action name).
    pub async fn act(&self, name: &str, args: Vec<Value>) -> Result<(), TreeError> {
        let def = {
            let arena = self.arena.lock().unwrap();
            let record = record_ref(&arena, self.id);
            if record.gate.is(NodeStatus::Closed) {
                return Err(TreeError::Closed {
                    node: record.name.clone(),
                });
            }
            record
                .actions
                .get(name)
                .cloned()
                .ok_or(TreeError::UnknownAction {
                    node: record.name.clone(),
                    name: name.to_string(),
                })?
        };

        if def.transactional {
            let prior = self.enter_transaction()?;
            let failure = match self.run_handler(&def.handler, args).await {
                Ok(Some(patch)) => {
                    self.apply_patch(patch);
                    None
                }
                Ok(None) => None,
                Err(failure) => Some(failure),
            };
            self.exit_transaction(prior);
            if let Some(failure) = failure {
                self.emit_error(ErrorEvent::Action {
                    action: name.to_string(),
                    message: failure.message,
                });
            }
            self.broadcast();
        } else {
            match self.run_handler(&def.handler, args).await {
                Ok(Some(patch)) => self.apply_patch(patch),
                Ok(None) => {}
                Err(failure) => self.emit_error(ErrorEvent::Action {
                    action: name.to_string(),
                    message: failure.message,
                }),
            }
        }
        Ok(())
    }

    async fn run_handler(&self, handler: &Handler, args: Vec<Value>) -> ActionResult {
        match handler {
            Handler::Sync(run) => run(self, &args),
            Handler::Async(run) => run(self.clone(), args).await,
        }
    }

    // ---- transactions -----------------------------------------------------

    /// Run a synchronous mutation session: status moves to Transacting,
    /// broadcasts are suppressed, and exactly one broadcast follows the
    /// body, however many mutations it made.
    ///
    /// A body failure is forwarded to the error lane, not re-raised, and
    /// mutations applied before the failure point are not rolled back.
    pub fn transact_sync(
        &self,
        body: impl FnOnce(&Node) -> Result<(), ActionFailure>,
    ) -> Result<(), TreeError> {
        let prior = self.enter_transaction()?;
        let outcome = body(self);
        self.exit_transaction(prior);
        if let Err(failure) = outcome {
            self.emit_error(ErrorEvent::Transaction {
                message: failure.message,
            });
        }
        self.broadcast();
        Ok(())
    }

    /// Asynchronous [`Node::transact_sync`]. Mutations scheduled by the body
    /// after its awaited points still land inside the transaction; anything
    /// the body spawns without awaiting broadcasts independently.
    pub async fn transact<F>(&self, body: F) -> Result<(), TreeError>
    where
        F: Future<Output = Result<(), ActionFailure>> + Send,
    {
        let prior = self.enter_transaction()?;
        let outcome = body.await;
        self.exit_transaction(prior);
        if let Err(failure) = outcome {
            self.emit_error(ErrorEvent::Transaction {
                message: failure.message,
            });
        }
        self.broadcast();
        Ok(())
    }

    fn enter_transaction(&self) -> Result<NodeStatus, TreeError> {
        let mut arena = self.arena.lock().unwrap();
        let record = record_mut(&mut arena, self.id);
        record
            .gate
            .go(NodeStatus::Transacting)
            .map_err(|_| TreeError::Closed {
                node: record.name.clone(),
            })
    }

    fn exit_transaction(&self, prior: NodeStatus) {
        let mut arena = self.arena.lock().unwrap();
        let record = record_mut(&mut arena, self.id);
        if record.gate.is(NodeStatus::Closed) {
            // the body closed the node; Closed stays terminal
            return;
        }
        let _ = record.gate.go(prior);
        if !matches!(record.content, Content::Empty) {
            record.gate.activate();
        }
    }

    // ---- watchers ---------------------------------------------------------

    /// Watch one named child. The handler — a callback, or the name of a
    /// registered synchronous action — fires synchronously on every
    /// successful update of that child, inside the surrounding transaction,
    /// with the child's name, new value, and old value.
    pub fn watch(&self, key: &str, handler: impl Into<WatchHandler>) -> Result<(), TreeError> {
        let handler = handler.into();
        let mut arena = self.arena.lock().unwrap();
        let baseline = arena
            .child_id(self.id, key)
            .map(|id| arena.snapshot(id))
            .unwrap_or(Value::Null);
        let record = record_mut(&mut arena, self.id);
        if record.gate.is(NodeStatus::Closed) {
            return Err(TreeError::Closed {
                node: record.name.clone(),
            });
        }
        record.watchers.push(WatchEntry {
            key: key.to_string(),
            handler,
            baseline,
        });
        Ok(())
    }

    /// Watch with a plain closure.
    pub fn watch_fn(
        &self,
        key: &str,
        handler: impl Fn(&Node, &WatchChange) + Send + Sync + 'static,
    ) -> Result<(), TreeError> {
        self.watch(key, WatchHandler::callback(handler))
    }

    // ---- subscriptions ----------------------------------------------------

    /// Subscribe to the value lane. The latest broadcast is replayed
    /// immediately; the callback receives the node handle and reads
    /// whatever it needs from it.
    pub fn subscribe(
        &self,
        callback: impl Fn(&Node) + Send + Sync + 'static,
    ) -> Result<Subscription, TreeError> {
        let relay = {
            let arena = self.arena.lock().unwrap();
            let record = record_ref(&arena, self.id);
            if record.gate.is(NodeStatus::Closed) {
                return Err(TreeError::Closed {
                    node: record.name.clone(),
                });
            }
            record.relay.clone()
        };
        Ok(relay.subscribe(callback))
    }

    /// Subscribe to the error lane.
    pub fn subscribe_errors(
        &self,
        callback: impl Fn(&ErrorEvent) + Send + Sync + 'static,
    ) -> Result<Subscription, TreeError> {
        let relay = {
            let arena = self.arena.lock().unwrap();
            let record = record_ref(&arena, self.id);
            if record.gate.is(NodeStatus::Closed) {
                return Err(TreeError::Closed {
                    node: record.name.clone(),
                });
            }
            record.relay.clone()
        };
        Ok(relay.subscribe_errors(callback))
    }

    /// Subscribe to the completion signal, delivered exactly once when the
    /// node closes.
    pub fn subscribe_complete(
        &self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<Subscription, TreeError> {
        let relay = {
            let arena = self.arena.lock().unwrap();
            let record = record_ref(&arena, self.id);
            if record.gate.is(NodeStatus::Closed) {
                return Err(TreeError::Closed {
                    node: record.name.clone(),
                });
            }
            record.relay.clone()
        };
        Ok(relay.subscribe_complete(callback))
    }

    // ---- lifecycle --------------------------------------------------------

    /// Close the node: release every child forwarding link, mark status
    /// Closed, and end both lanes. Irreversible; all further mutation and
    /// subscription calls fail. Children stay usable through their own
    /// handles.
    pub fn complete(&self) -> Result<(), TreeError> {
        let (links, relay) = {
            let mut arena = self.arena.lock().unwrap();
            let record = record_mut(&mut arena, self.id);
            if record.gate.is(NodeStatus::Closed) {
                return Err(TreeError::Closed {
                    node: record.name.clone(),
                });
            }
            let _ = record.gate.go(NodeStatus::Closed);
            (std::mem::take(&mut record.links), record.relay.clone())
        };
        drop(links);
        relay.complete();
        Ok(())
    }

    // ---- internals --------------------------------------------------------

    pub(crate) fn set_type(&self, ty: TypeSpec) {
        let mut arena = self.arena.lock().unwrap();
        record_mut(&mut arena, self.id).ty = Some(ty);
    }

    /// Apply an initial value without validation: construction seeds state,
    /// the type constraint guards later assignments.
    pub(crate) fn set_initial(&self, value: Value) {
        {
            let mut arena = self.arena.lock().unwrap();
            let record = record_mut(&mut arena, self.id);
            record.content = Content::Value(value);
            record.gate.activate();
        }
        self.broadcast();
    }

    fn add_child_record(
        &self,
        key: &str,
        value: Option<Value>,
        ty: Option<TypeSpec>,
    ) -> Result<Node, TreeError> {
        if key.is_empty() {
            return Err(TreeError::EmptyName);
        }
        let child = {
            let mut arena = self.arena.lock().unwrap();
            {
                let record = record_ref(&arena, self.id);
                if record.gate.is(NodeStatus::Closed) {
                    return Err(TreeError::Closed {
                        node: record.name.clone(),
                    });
                }
                if let Some(children) = record.content.children() {
                    if children.iter().any(|(name, _)| name == key) {
                        return Err(TreeError::DuplicateChild {
                            node: record.name.clone(),
                            key: key.to_string(),
                        });
                    }
                }
            }
            let mut child_record = NodeRecord::new(key, Some(self.id));
            child_record.ty = ty;
            if let Some(value) = value {
                child_record.content = Content::Value(value);
                child_record.gate.activate();
            }
            let child_id = arena.insert(child_record);
            let record = record_mut(&mut arena, self.id);
            match &mut record.content {
                Content::Children(children) => children.push((key.to_string(), child_id)),
                _ => {
                    // first child: the scalar value and type are purged for good
                    record.ty = None;
                    record.content = Content::Children(vec![(key.to_string(), child_id)]);
                }
            }
            record.gate.activate();
            Node::from_arena(Arc::clone(&self.arena), child_id)
        };
        self.install_auto_setter(key);
        self.wire_child(key, &child);
        self.broadcast();
        Ok(child)
    }

    fn install_auto_setter(&self, key: &str) {
        let action = format!("set{}", cap_first(key));
        let target = key.to_string();
        let def = ActionDef::sync(
            move |node, args| {
                let value = args.first().cloned().unwrap_or(Value::Null);
                node.update_child(&target, value);
                Ok(None)
            },
            true,
        );
        let mut arena = self.arena.lock().unwrap();
        let record = record_mut(&mut arena, self.id);
        record.actions.entry(action).or_insert(def);
    }

    fn wire_child(&self, key: &str, child: &Node) {
        let child_relay = {
            let arena = self.arena.lock().unwrap();
            record_ref(&arena, child.id).relay.clone()
        };

        let forward = self.clone();
        let value_key = key.to_string();
        let values = child_relay.subscribe(move |emitted: &Node| {
            forward.on_child_emit(&value_key, emitted);
        });

        let wrap = self.clone();
        let error_key = key.to_string();
        let errors = child_relay.subscribe_errors(move |event: &ErrorEvent| {
            wrap.emit_error(event.clone().into_child(error_key.clone()));
        });

        let mut arena = self.arena.lock().unwrap();
        let record = record_mut(&mut arena, self.id);
        record.links.insert(
            key.to_string(),
            ChildLink {
                _values: values,
                _errors: errors,
            },
        );
    }

    /// A child broadcast: fire the watchers following that key, then
    /// rebroadcast this node (suppressed while not Active).
    fn on_child_emit(&self, key: &str, child: &Node) {
        let fired: Vec<(WatchHandler, WatchChange)> = {
            let mut arena = self.arena.lock().unwrap();
            let current = arena.snapshot(child.id);
            let record = record_mut(&mut arena, self.id);
            record
                .watchers
                .iter_mut()
                .filter(|entry| entry.key == key)
                .filter_map(|entry| {
                    if entry.baseline == current {
                        return None;
                    }
                    let old_value = std::mem::replace(&mut entry.baseline, current.clone());
                    Some((
                        entry.handler.clone(),
                        WatchChange {
                            name: key.to_string(),
                            value: current.clone(),
                            old_value,
                        },
                    ))
                })
                .collect()
        };
        for (handler, change) in fired {
            self.run_watcher(handler, change);
        }
        self.broadcast();
    }

    fn run_watcher(&self, handler: WatchHandler, change: WatchChange) {
        match handler {
            WatchHandler::Callback(callback) => callback(self, &change),
            WatchHandler::Action(action) => {
                let def = {
                    let arena = self.arena.lock().unwrap();
                    record_ref(&arena, self.id).actions.get(&action).cloned()
                };
                let Some(def) = def else {
                    self.emit_error(ErrorEvent::Action {
                        action,
                        message: "watch action is not registered".to_string(),
                    });
                    return;
                };
                let Handler::Sync(run) = def.handler else {
                    self.emit_error(ErrorEvent::Action {
                        action,
                        message: "watch actions must be synchronous".to_string(),
                    });
                    return;
                };
                let args = serde_json::to_value(&change)
                    .map(|change| vec![change])
                    .unwrap_or_default();
                match run(self, &args) {
                    Ok(Some(patch)) => self.apply_patch(patch),
                    Ok(None) => {}
                    Err(failure) => self.emit_error(ErrorEvent::Action {
                        action,
                        message: failure.message,
                    }),
                }
            }
        }
    }

    /// Merge an action's keyed result into the children; a scalar result
    /// assigns a leaf.
    fn apply_patch(&self, patch: Value) {
        if self.has_children() {
            match patch {
                Value::Object(map) => {
                    let _ = self.set_fields(map);
                }
                other => {
                    tracing::warn!(
                        node = %self.name(),
                        value = %other,
                        "non-object action result ignored on a branch node"
                    );
                }
            }
        } else {
            let _ = self.set(patch);
        }
    }

    /// Route a value to one named child. Unknown keys and childless nodes
    /// are absorbed as [`ErrorEvent::ChildLookup`].
    pub(crate) fn update_child(&self, key: &str, value: Value) {
        let target = {
            let arena = self.arena.lock().unwrap();
            let record = record_ref(&arena, self.id);
            match arena.child_id(self.id, key) {
                Some(id) => Ok(Node::from_arena(Arc::clone(&self.arena), id)),
                None => Err(ErrorEvent::ChildLookup {
                    node: record.name.clone(),
                    key: key.to_string(),
                }),
            }
        };
        match target {
            Ok(child) => {
                if let Err(err) = child.set(value) {
                    self.emit_error(
                        ErrorEvent::Action {
                            action: "set".to_string(),
                            message: err.to_string(),
                        }
                        .into_child(key),
                    );
                }
            }
            Err(event) => self.emit_error(event),
        }
    }

    /// Emit this node on its value lane. Only Active nodes broadcast: New
    /// and Transacting are suppressed, Closed is logged and dropped.
    pub(crate) fn broadcast(&self) {
        let relay = {
            let arena = self.arena.lock().unwrap();
            let record = record_ref(&arena, self.id);
            match record.gate.current() {
                NodeStatus::Active => Some(record.relay.clone()),
                NodeStatus::Closed => {
                    tracing::warn!(node = %record.name, "broadcast attempted on a closed node");
                    None
                }
                NodeStatus::New | NodeStatus::Transacting => None,
            }
        };
        if let Some(relay) = relay {
            relay.emit(self.clone());
        }
    }

    pub(crate) fn emit_error(&self, event: ErrorEvent) {
        let relay = {
            let arena = self.arena.lock().unwrap();
            record_ref(&arena, self.id).relay.clone()
        };
        relay.emit_error(event);
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.arena, &other.arena) && self.id == other.id
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let arena = self.arena.lock().unwrap();
        let record = record_ref(&arena, self.id);
        f.debug_struct("Node")
            .field("name", &record.name)
            .field("status", &record.gate.current())
            .field("id", &self.id)
            .finish()
    }
}
