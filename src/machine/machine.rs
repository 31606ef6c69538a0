//! The guarded-transition engine.

use crate::channel::{Relay, Subscription};
use crate::machine::builder::BuildError;
use crate::machine::exits::StateSel;
use crate::machine::history::{History, TransitionRecord};
use crate::machine::state::StateDef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Errors raised by transition and dispatch attempts.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("machine '{name}' is done and accepts no further transitions")]
    Done { name: String },

    #[error("machine '{name}' is already transitioning to '{next}'")]
    InFlight { name: String, next: String },

    #[error("machine '{name}' has no state '{state}'")]
    UnknownState { name: String, state: String },

    #[error("machine '{name}': state '{to}' is unreachable from '{from}'")]
    Unreachable {
        name: String,
        from: String,
        to: String,
    },

    #[error("machine '{name}' cannot dispatch actions while unstable")]
    Unstable { name: String },
}

/// The in-flight transition marker: either nothing pending or a named
/// destination awaiting commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pending", content = "state", rename_all = "snake_case")]
pub enum Pending {
    Stable,
    To(String),
}

/// Structured view of the machine's transition status, broadcast on every
/// pending, commit, and revert edge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSnapshot {
    pub name: String,
    pub state: String,
    pub stable: bool,
    pub next: Option<String>,
}

/// Signature for machine-level action handlers.
pub type MachineHandler =
    Arc<dyn Fn(&Machine, &[Value]) -> Result<(), TransitionError> + Send + Sync>;

/// What an action resolves to: a destination state (delegating to
/// [`Machine::go`]) or a handler run with the machine and the call's
/// arguments.
#[derive(Clone)]
pub enum ActionTarget {
    Goto(String),
    Run(MachineHandler),
}

impl ActionTarget {
    pub fn goto(state: impl Into<String>) -> Self {
        ActionTarget::Goto(state.into())
    }

    pub fn run(
        handler: impl Fn(&Machine, &[Value]) -> Result<(), TransitionError> + Send + Sync + 'static,
    ) -> Self {
        ActionTarget::Run(Arc::new(handler))
    }
}

impl From<&str> for ActionTarget {
    fn from(state: &str) -> Self {
        ActionTarget::goto(state)
    }
}

impl From<String> for ActionTarget {
    fn from(state: String) -> Self {
        ActionTarget::Goto(state)
    }
}

impl std::fmt::Debug for ActionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionTarget::Goto(state) => f.debug_tuple("Goto").field(state).finish(),
            ActionTarget::Run(_) => f.write_str("Run(..)"),
        }
    }
}

/// Reachability matrix over the declared states, in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReachReport {
    pub states: Vec<String>,
    pub matrix: Vec<Vec<bool>>,
}

impl ReachReport {
    /// Whether `from` may exit to `to`; `None` when either name is unknown.
    pub fn can(&self, from: &str, to: &str) -> Option<bool> {
        let row = self.states.iter().position(|s| s == from)?;
        let col = self.states.iter().position(|s| s == to)?;
        Some(self.matrix[row][col])
    }
}

struct Inner {
    name: String,
    id: Uuid,
    states: Vec<StateDef>,
    current: String,
    pending: Pending,
    done: bool,
    actions: HashMap<String, ActionTarget>,
    history: History,
    stable_waiters: Vec<oneshot::Sender<()>>,
}

/// A guarded finite-state machine.
///
/// Cheap to clone; clones share the same underlying machine. State changes
/// are broadcast on two channels: the state channel carries the new state
/// name, the transition channel carries a [`TransitionSnapshot`] on every
/// pending/commit/revert edge. Both replay their latest value to late
/// subscribers.
#[derive(Clone)]
pub struct Machine {
    inner: Arc<Mutex<Inner>>,
    states_relay: Relay<String, TransitionError>,
    trans_relay: Relay<TransitionSnapshot, TransitionError>,
}

impl Machine {
    /// Build a machine from state definitions (bare names get wildcard
    /// exits). Fails when the name is empty, no states are declared, a state
    /// name repeats, or the start state is not among the declared states.
    pub fn new(
        name: impl Into<String>,
        states: impl IntoIterator<Item = impl Into<StateDef>>,
        start: &str,
    ) -> Result<Self, BuildError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::EmptyName);
        }
        let states: Vec<StateDef> = states.into_iter().map(Into::into).collect();
        if states.is_empty() {
            return Err(BuildError::NoStates);
        }
        for (i, state) in states.iter().enumerate() {
            if states[..i].iter().any(|s| s.name() == state.name()) {
                return Err(BuildError::DuplicateState(state.name().to_string()));
            }
        }
        if !states.iter().any(|s| s.name() == start) {
            return Err(BuildError::UnknownStartState {
                start: start.to_string(),
            });
        }

        let snapshot = TransitionSnapshot {
            name: name.clone(),
            state: start.to_string(),
            stable: true,
            next: None,
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                name,
                id: Uuid::new_v4(),
                states,
                current: start.to_string(),
                pending: Pending::Stable,
                done: false,
                actions: HashMap::new(),
                history: History::new(),
                stable_waiters: Vec::new(),
            })),
            states_relay: Relay::seeded(start.to_string()),
            trans_relay: Relay::seeded(snapshot),
        })
    }

    pub fn name(&self) -> String {
        self.inner.lock().unwrap().name.clone()
    }

    pub fn id(&self) -> Uuid {
        self.inner.lock().unwrap().id
    }

    /// The current (committed) state name.
    pub fn state(&self) -> String {
        self.inner.lock().unwrap().current.clone()
    }

    /// The in-flight destination, if a transition is pending.
    pub fn next_state(&self) -> Option<String> {
        match &self.inner.lock().unwrap().pending {
            Pending::Stable => None,
            Pending::To(next) => Some(next.clone()),
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self.inner.lock().unwrap().pending, Pending::Stable)
    }

    pub fn is_done(&self) -> bool {
        self.inner.lock().unwrap().done
    }

    pub fn has(&self, state: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .states
            .iter()
            .any(|s| s.name() == state)
    }

    pub fn state_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .states
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// The committed transition history.
    pub fn history(&self) -> History {
        self.inner.lock().unwrap().history.clone()
    }

    /// Current structured transition status.
    pub fn snapshot(&self) -> TransitionSnapshot {
        let inner = self.inner.lock().unwrap();
        TransitionSnapshot {
            name: inner.name.clone(),
            state: inner.current.clone(),
            stable: matches!(inner.pending, Pending::Stable),
            next: match &inner.pending {
                Pending::Stable => None,
                Pending::To(next) => Some(next.clone()),
            },
        }
    }

    /// Whether the current state's exit set permits `target`.
    pub fn can_go(&self, target: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .states
            .iter()
            .find(|s| s.name() == inner.current)
            .map(|s| s.can_go(target))
            .unwrap_or(false)
    }

    /// Commit a transition immediately.
    ///
    /// Fails when the machine is done, a transition is already in flight,
    /// the target is unknown, or the current state's exits do not permit it.
    pub fn go(&self, target: &str) -> Result<(), TransitionError> {
        {
            let mut inner = self.inner.lock().unwrap();
            Self::check_target(&inner, target)?;
            Self::commit(&mut inner, target);
        }
        self.states_relay.emit(target.to_string());
        self.trans_relay.emit(self.snapshot());
        Ok(())
    }

    /// Begin a gated transition.
    ///
    /// Validation happens here, and the pending destination is marked
    /// eagerly: `next_state()` reports it and the transition channel emits a
    /// pending snapshot before the returned future is first polled. Awaiting
    /// the future waits on the gate; `Ok` commits, `Err` reverts the machine
    /// to stable at the previous current state without raising.
    pub fn go_when<F, G>(
        &self,
        target: &str,
        gate: F,
    ) -> Result<impl Future<Output = Result<(), TransitionError>> + Send, TransitionError>
    where
        F: Future<Output = Result<(), G>> + Send + 'static,
        G: Send,
    {
        {
            let mut inner = self.inner.lock().unwrap();
            Self::check_target(&inner, target)?;
            inner.pending = Pending::To(target.to_string());
        }
        self.trans_relay.emit(self.snapshot());

        let machine = self.clone();
        let target = target.to_string();
        Ok(async move {
            match gate.await {
                Ok(()) => machine.arrive(&target),
                Err(_) => {
                    machine.revert();
                    Ok(())
                }
            }
        })
    }

    /// Dispatch a named action.
    ///
    /// Fails unless the machine is stable. Resolution order: the machine's
    /// global action map, then the current state's local map. A destination
    /// target delegates to [`Machine::go`]; an unresolved name is a no-op,
    /// not an error.
    pub fn dispatch(&self, action: &str, args: &[Value]) -> Result<(), TransitionError> {
        let target = {
            let inner = self.inner.lock().unwrap();
            if let Pending::To(_) = inner.pending {
                return Err(TransitionError::Unstable {
                    name: inner.name.clone(),
                });
            }
            inner.actions.get(action).cloned().or_else(|| {
                inner
                    .states
                    .iter()
                    .find(|s| s.name() == inner.current)
                    .and_then(|s| s.action(action).cloned())
            })
        };
        match target {
            Some(ActionTarget::Run(handler)) => handler(self, args),
            Some(ActionTarget::Goto(state)) => self.go(&state),
            None => Ok(()),
        }
    }

    /// Wait for stability, then dispatch.
    pub async fn dispatch_when_stable(
        &self,
        action: &str,
        args: &[Value],
    ) -> Result<(), TransitionError> {
        self.when_stable().await;
        self.dispatch(action, args)
    }

    /// Register an action on one state or on all of them.
    pub fn add_action(
        &self,
        action: &str,
        from: impl Into<StateSel>,
        target: impl Into<ActionTarget>,
    ) -> Result<(), TransitionError> {
        let target = target.into();
        let mut inner = self.inner.lock().unwrap();
        let machine_name = inner.name.clone();
        match from.into() {
            StateSel::All => {
                for state in inner.states.iter_mut() {
                    state.add_action(action.to_string(), target.clone());
                }
            }
            StateSel::Name(name) => {
                let state = inner
                    .states
                    .iter_mut()
                    .find(|s| s.name() == name)
                    .ok_or(TransitionError::UnknownState {
                        name: machine_name,
                        state: name.clone(),
                    })?;
                state.add_action(action.to_string(), target.clone());
            }
        }
        Ok(())
    }

    /// Register a machine-level action, consulted before any state-local
    /// map. Re-registering a name replaces the previous target.
    pub fn add_global_action(&self, action: &str, target: impl Into<ActionTarget>) {
        self.inner
            .lock()
            .unwrap()
            .actions
            .insert(action.to_string(), target.into());
    }

    /// Widen exit sets: permit `to` out of the selected states.
    pub fn allow(
        &self,
        from: impl Into<StateSel>,
        to: impl Into<StateSel>,
    ) -> Result<(), TransitionError> {
        let to = to.into();
        self.with_selected(from.into(), |state| match &to {
            StateSel::All => state.exits_mut().allow_all(),
            StateSel::Name(name) => state.exits_mut().allow(name.clone()),
        })
    }

    /// Replace exit sets: the selected states may exit only to `to`.
    pub fn allow_only(
        &self,
        from: impl Into<StateSel>,
        to: impl Into<StateSel>,
    ) -> Result<(), TransitionError> {
        let to = to.into();
        self.with_selected(from.into(), |state| match &to {
            StateSel::All => state.exits_mut().allow_all(),
            StateSel::Name(name) => state.exits_mut().allow_only(name.clone()),
        })
    }

    /// Narrow exit sets: forbid `to` out of the selected states. Blocking a
    /// wildcard state first enumerates the declared states.
    pub fn block(
        &self,
        from: impl Into<StateSel>,
        to: impl Into<StateSel>,
    ) -> Result<(), TransitionError> {
        let to = to.into();
        let universe = self.state_names();
        self.with_selected(from.into(), |state| match &to {
            StateSel::All => state.exits_mut().block_all(),
            StateSel::Name(name) => state.exits_mut().block(name, &universe),
        })
    }

    /// Reachability matrix for introspection and tests.
    pub fn report(&self) -> ReachReport {
        let inner = self.inner.lock().unwrap();
        let states: Vec<String> = inner.states.iter().map(|s| s.name().to_string()).collect();
        let matrix = inner
            .states
            .iter()
            .map(|from| states.iter().map(|to| from.can_go(to)).collect())
            .collect();
        ReachReport { states, matrix }
    }

    /// Resolves once the machine is stable; immediately if it already is.
    pub fn when_stable(&self) -> impl Future<Output = ()> + Send {
        let waiter = {
            let mut inner = self.inner.lock().unwrap();
            if matches!(inner.pending, Pending::Stable) {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                inner.stable_waiters.push(tx);
                Some(rx)
            }
        };
        async move {
            if let Some(rx) = waiter {
                let _ = rx.await;
            }
        }
    }

    /// Forbid all further transitions. The machine stays readable.
    pub fn mark_done(&self) {
        self.inner.lock().unwrap().done = true;
    }

    /// Mark the machine done and end both broadcast channels. Subscribers
    /// receive exactly one completion signal.
    pub fn complete(&self) {
        self.mark_done();
        self.trans_relay.complete();
        self.states_relay.complete();
    }

    /// Subscribe to committed state names. The latest state is replayed
    /// immediately.
    pub fn subscribe(&self, callback: impl Fn(&str) + Send + Sync + 'static) -> Subscription {
        self.states_relay.subscribe(move |state| callback(state))
    }

    /// Subscribe to structured transition snapshots, emitted on every
    /// pending, commit, and revert edge.
    pub fn subscribe_transitions(
        &self,
        callback: impl Fn(&TransitionSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.trans_relay.subscribe(callback)
    }

    /// Subscribe to the completion signal of the state channel.
    pub fn subscribe_complete(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.states_relay.subscribe_complete(callback)
    }

    fn check_target(inner: &Inner, target: &str) -> Result<(), TransitionError> {
        if inner.done {
            return Err(TransitionError::Done {
                name: inner.name.clone(),
            });
        }
        if let Pending::To(next) = &inner.pending {
            return Err(TransitionError::InFlight {
                name: inner.name.clone(),
                next: next.clone(),
            });
        }
        if !inner.states.iter().any(|s| s.name() == target) {
            return Err(TransitionError::UnknownState {
                name: inner.name.clone(),
                state: target.to_string(),
            });
        }
        let reachable = inner
            .states
            .iter()
            .find(|s| s.name() == inner.current)
            .map(|s| s.can_go(target))
            .unwrap_or(false);
        if !reachable {
            return Err(TransitionError::Unreachable {
                name: inner.name.clone(),
                from: inner.current.clone(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    fn commit(inner: &mut Inner, target: &str) {
        let from = inner.current.clone();
        inner.history = inner.history.record(TransitionRecord::new(&from, target));
        inner.current = target.to_string();
        inner.pending = Pending::Stable;
        for waiter in inner.stable_waiters.drain(..) {
            let _ = waiter.send(());
        }
        tracing::debug!(machine = %inner.name, %from, to = %target, "transition committed");
    }

    fn arrive(&self, target: &str) -> Result<(), TransitionError> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.done {
                return Err(TransitionError::Done {
                    name: inner.name.clone(),
                });
            }
            Self::commit(&mut inner, target);
        }
        self.states_relay.emit(target.to_string());
        self.trans_relay.emit(self.snapshot());
        Ok(())
    }

    fn revert(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.pending = Pending::Stable;
            for waiter in inner.stable_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
        self.trans_relay.emit(self.snapshot());
    }

    fn with_selected(
        &self,
        from: StateSel,
        mut apply: impl FnMut(&mut StateDef),
    ) -> Result<(), TransitionError> {
        let mut inner = self.inner.lock().unwrap();
        let machine_name = inner.name.clone();
        match from {
            StateSel::All => {
                for state in inner.states.iter_mut() {
                    apply(state);
                }
            }
            StateSel::Name(name) => {
                let state = inner
                    .states
                    .iter_mut()
                    .find(|s| s.name() == name)
                    .ok_or(TransitionError::UnknownState {
                        name: machine_name,
                        state: name.clone(),
                    })?;
                apply(state);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("Machine")
            .field("name", &inner.name)
            .field("id", &inner.id)
            .field("state", &inner.current)
            .field("pending", &inner.pending)
            .field("done", &inner.done)
            .finish()
    }
}
