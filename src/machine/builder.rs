//! Fluent construction for machines.

use crate::machine::exits::StateSel;
use crate::machine::machine::{ActionTarget, Machine, TransitionError};
use crate::machine::state::StateDef;
use thiserror::Error;

/// Errors raised while assembling a machine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("machine name must not be empty")]
    EmptyName,

    #[error("no states declared; add at least one state")]
    NoStates,

    #[error("duplicate state '{0}'")]
    DuplicateState(String),

    #[error("start state '{start}' is not among the declared states")]
    UnknownStartState { start: String },

    #[error("start state not specified; call .start(state) before .build()")]
    MissingStartState,

    #[error("action '{action}' names unknown state '{state}'")]
    ActionUnknownState { action: String, state: String },
}

/// Builder for [`Machine`] with states, exits, and actions declared up
/// front.
pub struct MachineBuilder {
    name: String,
    states: Vec<StateDef>,
    start: Option<String>,
    actions: Vec<(String, StateSel, ActionTarget)>,
    global_actions: Vec<(String, ActionTarget)>,
}

impl MachineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            start: None,
            actions: Vec::new(),
            global_actions: Vec::new(),
        }
    }

    /// Declare one state (a bare name gets wildcard exits).
    pub fn state(mut self, state: impl Into<StateDef>) -> Self {
        self.states.push(state.into());
        self
    }

    /// Declare several states at once.
    pub fn states(mut self, states: impl IntoIterator<Item = impl Into<StateDef>>) -> Self {
        self.states.extend(states.into_iter().map(Into::into));
        self
    }

    /// Set the start state (required).
    pub fn start(mut self, state: impl Into<String>) -> Self {
        self.start = Some(state.into());
        self
    }

    /// Bind an action on one state or all of them.
    pub fn action(
        mut self,
        name: impl Into<String>,
        from: impl Into<StateSel>,
        target: impl Into<ActionTarget>,
    ) -> Self {
        self.actions.push((name.into(), from.into(), target.into()));
        self
    }

    /// Bind a machine-level action.
    pub fn global_action(mut self, name: impl Into<String>, target: impl Into<ActionTarget>) -> Self {
        self.global_actions.push((name.into(), target.into()));
        self
    }

    /// Assemble the machine.
    pub fn build(self) -> Result<Machine, BuildError> {
        let start = self.start.ok_or(BuildError::MissingStartState)?;
        let machine = Machine::new(self.name, self.states, &start)?;
        for (name, from, target) in self.actions {
            machine
                .add_action(&name, from, target)
                .map_err(|err| match err {
                    TransitionError::UnknownState { state, .. } => BuildError::ActionUnknownState {
                        action: name.clone(),
                        state,
                    },
                    other => BuildError::ActionUnknownState {
                        action: name.clone(),
                        state: other.to_string(),
                    },
                })?;
        }
        for (name, target) in self.global_actions {
            machine.add_global_action(&name, target);
        }
        Ok(machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::exits::StateSel;

    #[test]
    fn builder_requires_a_start_state() {
        let result = MachineBuilder::new("stoplight").state("red").build();
        assert_eq!(result.err(), Some(BuildError::MissingStartState));
    }

    #[test]
    fn builder_requires_states() {
        let result = MachineBuilder::new("stoplight").start("red").build();
        assert_eq!(result.err(), Some(BuildError::NoStates));
    }

    #[test]
    fn fluent_build_wires_states_and_actions() {
        let machine = MachineBuilder::new("stoplight")
            .states(["red", "yellow", "green"])
            .start("red")
            .action("advance", "red", "green")
            .action("advance", "green", "yellow")
            .action("advance", "yellow", "red")
            .build()
            .unwrap();

        assert_eq!(machine.state(), "red");
        machine.dispatch("advance", &[]).unwrap();
        assert_eq!(machine.state(), "green");
    }

    #[test]
    fn action_on_unknown_state_fails_the_build() {
        let result = MachineBuilder::new("stoplight")
            .states(["red", "yellow"])
            .start("red")
            .action("advance", "blue", "red")
            .build();
        assert_eq!(
            result.err(),
            Some(BuildError::ActionUnknownState {
                action: "advance".to_string(),
                state: "blue".to_string()
            })
        );
    }

    #[test]
    fn wildcard_action_binds_to_every_state() {
        let machine = MachineBuilder::new("stoplight")
            .states(["red", "yellow", "green"])
            .start("green")
            .action("halt", StateSel::All, "red")
            .build()
            .unwrap();

        machine.dispatch("halt", &[]).unwrap();
        assert_eq!(machine.state(), "red");
    }

    #[test]
    fn explicit_exits_survive_the_build() {
        let machine = MachineBuilder::new("stoplight")
            .state(crate::machine::StateDef::with_exits("red", ["green"]))
            .state("green")
            .start("red")
            .build()
            .unwrap();

        assert!(machine.can_go("green"));
        assert!(!machine.can_go("red"));
    }
}
