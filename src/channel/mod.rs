//! Multicast change notification.
//!
//! [`Relay`] is the broadcast primitive every node and machine in this crate
//! speaks through: a replay-latest value lane, a disjoint error lane, and a
//! one-shot completion signal. Subscriptions are RAII guards.

mod relay;

pub use relay::{Relay, Subscription};
