//! Exit sets: which states a state may leave for.
//!
//! An exit set is either wildcard ("everything reachable") or an explicit
//! enumerated set. The two are mutually exclusive representations of the same
//! permission concept, so the type is a tagged enum rather than a sentinel
//! member hiding inside a set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The permitted destinations out of one state.
///
/// Generic over the state representation: the machine engine keys exits by
/// state name, the node tree keys them by [`NodeStatus`](crate::tree::NodeStatus).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exits<S: Ord> {
    /// Every declared state is reachable.
    All,
    /// Only the listed states are reachable.
    Only(BTreeSet<S>),
}

impl<S: Ord> Exits<S> {
    /// Wildcard exits.
    pub fn all() -> Self {
        Exits::All
    }

    /// An empty exit set: no destination is reachable.
    pub fn none() -> Self {
        Exits::Only(BTreeSet::new())
    }

    /// An enumerated exit set.
    pub fn only(states: impl IntoIterator<Item = S>) -> Self {
        Exits::Only(states.into_iter().collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Exits::All)
    }

    /// Whether `state` is a permitted destination.
    pub fn contains(&self, state: &S) -> bool {
        match self {
            Exits::All => true,
            Exits::Only(set) => set.contains(state),
        }
    }

    /// Permit one more destination. A wildcard set is already maximal, so
    /// this is a no-op there.
    pub fn allow(&mut self, state: S) {
        if let Exits::Only(set) = self {
            set.insert(state);
        }
    }

    /// Replace the set with exactly one destination.
    pub fn allow_only(&mut self, state: S) {
        *self = Exits::only([state]);
    }

    /// Widen to wildcard.
    pub fn allow_all(&mut self) {
        *self = Exits::All;
    }

    /// Remove one destination. Blocking a wildcard set first enumerates the
    /// declared universe, then removes the state from it.
    pub fn block(&mut self, state: &S, universe: &[S])
    where
        S: Clone,
    {
        if self.is_all() {
            *self = Exits::only(universe.iter().cloned());
        }
        if let Exits::Only(set) = self {
            set.remove(state);
        }
    }

    /// Remove every destination.
    pub fn block_all(&mut self) {
        *self = Exits::none();
    }
}

/// Selector used by [`Machine::allow`](crate::machine::Machine::allow) and
/// friends to address one state or all of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateSel {
    All,
    Name(String),
}

impl From<&str> for StateSel {
    fn from(name: &str) -> Self {
        StateSel::Name(name.to_string())
    }
}

impl From<String> for StateSel {
    fn from(name: String) -> Self {
        StateSel::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_contains_everything() {
        let exits: Exits<String> = Exits::all();
        assert!(exits.contains(&"anything".to_string()));
        assert!(exits.is_all());
    }

    #[test]
    fn enumerated_set_contains_only_its_members() {
        let exits = Exits::only(["yellow".to_string()]);
        assert!(exits.contains(&"yellow".to_string()));
        assert!(!exits.contains(&"green".to_string()));
    }

    #[test]
    fn allow_on_wildcard_is_a_noop() {
        let mut exits: Exits<String> = Exits::all();
        exits.allow("red".to_string());
        assert!(exits.is_all());
    }

    #[test]
    fn blocking_a_wildcard_enumerates_the_universe_first() {
        let universe: Vec<String> = ["red", "yellow", "green"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut exits: Exits<String> = Exits::all();
        exits.block(&"yellow".to_string(), &universe);

        assert!(!exits.is_all());
        assert!(exits.contains(&"red".to_string()));
        assert!(!exits.contains(&"yellow".to_string()));
        assert!(exits.contains(&"green".to_string()));
    }

    #[test]
    fn allow_only_replaces_the_set() {
        let mut exits = Exits::only(["red".to_string(), "green".to_string()]);
        exits.allow_only("yellow".to_string());
        assert!(exits.contains(&"yellow".to_string()));
        assert!(!exits.contains(&"red".to_string()));
    }

    #[test]
    fn block_all_empties_the_set() {
        let mut exits: Exits<String> = Exits::all();
        exits.block_all();
        assert!(!exits.contains(&"red".to_string()));
    }
}
