//! Per-state definition: identity, exit set, local actions.

use crate::machine::exits::Exits;
use crate::machine::machine::ActionTarget;
use std::collections::HashMap;

/// One declared state of a [`Machine`](crate::machine::Machine).
///
/// Carries the state's name (unique within its machine), its exit set, and a
/// local action map consulted when the machine dispatches an action while in
/// this state.
#[derive(Clone)]
pub struct StateDef {
    name: String,
    exits: Exits<String>,
    actions: HashMap<String, ActionTarget>,
}

impl StateDef {
    /// A state with wildcard exits.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exits: Exits::all(),
            actions: HashMap::new(),
        }
    }

    /// A state with an enumerated exit set.
    pub fn with_exits(
        name: impl Into<String>,
        exits: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            exits: Exits::only(exits.into_iter().map(Into::into)),
            actions: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exits(&self) -> &Exits<String> {
        &self.exits
    }

    /// Whether `target` is a permitted destination out of this state.
    pub fn can_go(&self, target: &str) -> bool {
        self.exits.contains(&target.to_string())
    }

    pub(crate) fn exits_mut(&mut self) -> &mut Exits<String> {
        &mut self.exits
    }

    pub(crate) fn add_action(&mut self, name: String, target: ActionTarget) {
        self.actions.insert(name, target);
    }

    pub(crate) fn action(&self, name: &str) -> Option<&ActionTarget> {
        self.actions.get(name)
    }
}

impl std::fmt::Debug for StateDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDef")
            .field("name", &self.name)
            .field("exits", &self.exits)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl From<&str> for StateDef {
    fn from(name: &str) -> Self {
        StateDef::new(name)
    }
}

impl From<String> for StateDef {
    fn from(name: String) -> Self {
        StateDef::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_allows_every_exit() {
        let state = StateDef::new("red");
        assert_eq!(state.name(), "red");
        assert!(state.can_go("green"));
        assert!(state.can_go("red"));
    }

    #[test]
    fn enumerated_exits_restrict_destinations() {
        let state = StateDef::with_exits("red", ["green"]);
        assert!(state.can_go("green"));
        assert!(!state.can_go("yellow"));
    }

    #[test]
    fn local_actions_resolve_by_name() {
        let mut state = StateDef::new("red");
        state.add_action("advance".to_string(), ActionTarget::goto("green"));
        assert!(state.action("advance").is_some());
        assert!(state.action("retreat").is_none());
    }
}
