//! Replay-latest multicast channel.
//!
//! A `Relay` keeps three disjoint subscriber lists: value subscribers,
//! error subscribers, and completion subscribers. The last emitted value is
//! cached and replayed to every late value subscriber, so an observer never
//! has to wait for the next change to learn the current state. Errors travel
//! on their own lane; a fault never terminates or even touches the value
//! subscribers.
//!
//! Callbacks are invoked with the channel's internal lock released, so a
//! subscriber may re-enter the relay (emit, subscribe, unsubscribe) from
//! inside its own callback.

use std::sync::{Arc, Mutex, Weak};

type ValueFn<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorFn<E> = Arc<dyn Fn(&E) + Send + Sync>;
type DoneFn = Arc<dyn Fn() + Send + Sync>;

struct RelayInner<T, E> {
    last: Option<T>,
    done: bool,
    next_key: u64,
    values: Vec<(u64, ValueFn<T>)>,
    errors: Vec<(u64, ErrorFn<E>)>,
    completions: Vec<(u64, DoneFn)>,
}

/// A replay-latest multicast channel with a disjoint error lane.
pub struct Relay<T, E> {
    inner: Arc<Mutex<RelayInner<T, E>>>,
}

impl<T, E> Clone for Relay<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Default for Relay<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Relay<T, E> {
    /// Create an empty relay. The first value subscriber receives nothing
    /// until something is emitted.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RelayInner {
                last: None,
                done: false,
                next_key: 0,
                values: Vec::new(),
                errors: Vec::new(),
                completions: Vec::new(),
            })),
        }
    }

    /// Create a relay pre-loaded with an initial value, replayed to every
    /// subscriber exactly as if it had been emitted.
    pub fn seeded(initial: T) -> Self {
        let relay = Self::new();
        relay.inner.lock().unwrap().last = Some(initial);
        relay
    }

    /// Whether `complete` has been called.
    pub fn is_done(&self) -> bool {
        self.inner.lock().unwrap().done
    }

    /// Number of live value subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().values.len()
    }
}

impl<T: Send + 'static, E: Send + 'static> Relay<T, E> {
    /// Subscribe to the value lane. The cached latest value, if any, is
    /// replayed immediately. Dropping the returned guard unsubscribes.
    ///
    /// Subscribing to a completed relay is inert: the callback is never
    /// registered and never called.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: Clone,
    {
        let callback: ValueFn<T> = Arc::new(callback);
        let guard = {
            let mut inner = self.inner.lock().unwrap();
            if inner.done {
                return Subscription::inert();
            }
            let key = inner.next_key;
            inner.next_key += 1;
            inner.values.push((key, Arc::clone(&callback)));
            self.guarded(key, Lane::Values)
        };
        // Replay outside the lock: the callback may re-enter this relay.
        if let Some(last) = self.snapshot_last() {
            callback(&last);
        }
        guard
    }

    /// Subscribe to the error lane. Errors are not replayed.
    pub fn subscribe_errors(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let mut inner = self.inner.lock().unwrap();
        if inner.done {
            return Subscription::inert();
        }
        let key = inner.next_key;
        inner.next_key += 1;
        inner.errors.push((key, Arc::new(callback)));
        drop(inner);
        self.guarded(key, Lane::Errors)
    }

    /// Subscribe to the completion signal. Each subscriber is notified
    /// exactly once; subscribing after completion fires immediately.
    pub fn subscribe_complete(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        let mut inner = self.inner.lock().unwrap();
        if inner.done {
            drop(inner);
            callback();
            return Subscription::inert();
        }
        let key = inner.next_key;
        inner.next_key += 1;
        inner.completions.push((key, Arc::new(callback)));
        drop(inner);
        self.guarded(key, Lane::Completions)
    }

    /// Emit a value: cache it as the latest and notify every value
    /// subscriber. Emissions on a completed relay are dropped.
    pub fn emit(&self, value: T)
    where
        T: Clone,
    {
        let callbacks = {
            let mut inner = self.inner.lock().unwrap();
            if inner.done {
                tracing::warn!("value emitted on a completed relay; dropped");
                return;
            }
            inner.last = Some(value.clone());
            inner
                .values
                .iter()
                .map(|(_, cb)| Arc::clone(cb))
                .collect::<Vec<_>>()
        };
        for callback in callbacks {
            callback(&value);
        }
    }

    /// Emit an error to the error lane only. Value subscribers are
    /// untouched, as is the cached latest value.
    pub fn emit_error(&self, error: E) {
        let callbacks = {
            let inner = self.inner.lock().unwrap();
            if inner.done {
                return;
            }
            inner
                .errors
                .iter()
                .map(|(_, cb)| Arc::clone(cb))
                .collect::<Vec<_>>()
        };
        for callback in callbacks {
            callback(&error);
        }
    }

    /// Complete the relay: notify each completion subscriber once, then
    /// drop every subscriber on every lane. Idempotent.
    pub fn complete(&self) {
        let callbacks = {
            let mut inner = self.inner.lock().unwrap();
            if inner.done {
                return;
            }
            inner.done = true;
            inner.values.clear();
            inner.errors.clear();
            std::mem::take(&mut inner.completions)
        };
        for (_, callback) in callbacks {
            callback();
        }
    }

    /// The cached latest value.
    pub fn last(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.lock().unwrap().last.clone()
    }

    fn snapshot_last(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.lock().unwrap().last.clone()
    }

    fn guarded(&self, key: u64, lane: Lane) -> Subscription {
        let weak: Weak<Mutex<RelayInner<T, E>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut inner = inner.lock().unwrap();
                    match lane {
                        Lane::Values => inner.values.retain(|(k, _)| *k != key),
                        Lane::Errors => inner.errors.retain(|(k, _)| *k != key),
                        Lane::Completions => inner.completions.retain(|(k, _)| *k != key),
                    }
                }
            })),
        }
    }
}

#[derive(Clone, Copy)]
enum Lane {
    Values,
    Errors,
    Completions,
}

/// RAII handle for a relay subscription. Dropping it (or calling
/// [`Subscription::unsubscribe`]) removes the subscriber from its lane.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn inert() -> Self {
        Self { cancel: None }
    }

    /// Explicitly remove the subscriber. Equivalent to dropping the guard.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.cancel.is_some())
            .finish()
    }
}
