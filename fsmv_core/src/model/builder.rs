use super::{Automaton, ModelError, State, StateId, StateIdx, Transition};
use crate::expression::{Guard, parse_actions, parse_outputs};
use log::{debug, info};
use std::collections::BTreeMap;

/// The textual expressions labelling a transition.
///
/// ```
/// # use fsmv_core::Label;
/// let label = Label::new().guard("x < 3").set("x = x + 1").output("tick = 1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Label {
    guard: String,
    set: String,
    output: String,
    annotation: Option<String>,
}

impl Label {
    /// Creates an empty label (always-enabled guard, no actions).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the guard expression.
    pub fn guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = guard.into();
        self
    }

    /// Sets the set-action expression.
    pub fn set(mut self, set: impl Into<String>) -> Self {
        self.set = set.into();
        self
    }

    /// Sets the output-action expression.
    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Sets the annotation.
    /// Blank annotations count as absent.
    pub fn annotation(mut self, annotation: impl Into<String>) -> Self {
        let annotation = annotation.into();
        self.annotation = (!annotation.trim().is_empty()).then_some(annotation);
        self
    }
}

/// Defines and builds an [`Automaton`].
#[derive(Debug, Clone)]
pub struct AutomatonBuilder {
    name: String,
    states: Vec<State>,
    transitions: Vec<Transition>,
    variables: BTreeMap<String, i64>,
}

impl AutomatonBuilder {
    /// Creates a new [`AutomatonBuilder`] with no states.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            transitions: Vec::new(),
            variables: BTreeMap::new(),
        }
    }

    /// Adds a new (non-initial) state.
    ///
    /// ```
    /// # use fsmv_core::AutomatonBuilder;
    /// let mut builder = AutomatonBuilder::new("M");
    /// builder.new_state("A").expect("new state");
    /// builder.new_state("A").expect_err("name already taken");
    /// ```
    #[inline(always)]
    pub fn new_state(&mut self, name: impl Into<String>) -> Result<StateId, ModelError> {
        self.push_state(name.into(), false)
    }

    /// Adds a new state marked initial.
    #[inline(always)]
    pub fn new_initial_state(&mut self, name: impl Into<String>) -> Result<StateId, ModelError> {
        self.push_state(name.into(), true)
    }

    pub(crate) fn push_state(&mut self, name: String, initial: bool) -> Result<StateId, ModelError> {
        if self.states.iter().any(|state| state.name == name) {
            return Err(ModelError::DuplicateState(name, self.name.clone()));
        }
        let idx = self.states.len();
        self.states.push(State {
            name,
            initial,
            refinements: Vec::new(),
        });
        Ok(StateId(idx as StateIdx))
    }

    /// Attaches a refinement automaton to a state.
    ///
    /// Multiple refinements are accepted here, and rejected by flattening.
    pub fn add_refinement(&mut self, state: StateId, refinement: Automaton) -> Result<(), ModelError> {
        let name = self.name.clone();
        self.states
            .get_mut(state.index())
            .ok_or(ModelError::MissingState(state, name))?
            .refinements
            .push(refinement);
        Ok(())
    }

    /// Declares a variable with its initial value.
    pub fn new_var(&mut self, name: impl Into<String>, init: i64) -> Result<(), ModelError> {
        let name = name.into();
        if self.variables.contains_key(&name) {
            Err(ModelError::DuplicateVariable(name, self.name.clone()))
        } else {
            self.variables.insert(name, init);
            Ok(())
        }
    }

    /// Adds a transition, classifying the expressions of its label.
    ///
    /// ```
    /// # use fsmv_core::{AutomatonBuilder, Label};
    /// let mut builder = AutomatonBuilder::new("M");
    /// let a = builder.new_initial_state("A").unwrap();
    /// let b = builder.new_state("B").unwrap();
    /// builder
    ///     .add_transition("t", a, b, Label::new().guard("x == 1"))
    ///     .expect("add transition");
    /// let automaton = builder.build().expect("build automaton");
    /// assert_eq!(automaton.transitions().len(), 1);
    /// ```
    pub fn add_transition(
        &mut self,
        name: impl Into<String>,
        source: StateId,
        target: StateId,
        label: Label,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if self.transitions.iter().any(|t| t.name == name) {
            return Err(ModelError::DuplicateTransition(name, self.name.clone()));
        }
        self.check_state(source)?;
        self.check_state(target)?;
        let transition = Transition {
            guard: Guard::parse(&label.guard),
            actions: parse_actions(&label.set),
            outputs: parse_outputs(&label.output),
            annotation: label.annotation,
            name,
            source,
            target,
        };
        self.transitions.push(transition);
        Ok(())
    }

    // Copies an already classified transition with new endpoints and name.
    pub(crate) fn copy_transition(
        &mut self,
        name: String,
        source: StateId,
        target: StateId,
        template: &Transition,
    ) -> Result<(), ModelError> {
        self.check_state(source)?;
        self.check_state(target)?;
        self.transitions.push(Transition {
            name,
            source,
            target,
            ..template.clone()
        });
        Ok(())
    }

    // Merges declarations, keeping the first one for clashing names.
    pub(crate) fn merge_variables(&mut self, variables: &BTreeMap<String, i64>) {
        for (var, init) in variables {
            self.variables.entry(var.clone()).or_insert(*init);
        }
    }

    #[inline(always)]
    fn check_state(&self, state: StateId) -> Result<(), ModelError> {
        if state.index() < self.states.len() {
            Ok(())
        } else {
            Err(ModelError::MissingState(state, self.name.clone()))
        }
    }

    /// Produces the [`Automaton`], checking that exactly one state is initial.
    pub fn build(self) -> Result<Automaton, ModelError> {
        let mut initials = self.states.iter().enumerate().filter(|(_, s)| s.initial);
        let (initial, first) = initials
            .next()
            .ok_or_else(|| ModelError::NoInitialState(self.name.clone()))?;
        if let Some((_, second)) = initials.next() {
            return Err(ModelError::MultipleInitialStates(
                self.name.clone(),
                first.name.clone(),
                second.name.clone(),
            ));
        }
        let initial = StateId(initial as StateIdx);
        debug!(
            "automaton `{}`: {} states, {} transitions",
            self.name,
            self.states.len(),
            self.transitions.len()
        );
        info!(target: "build", "built automaton `{}`", self.name);
        Ok(Automaton {
            name: self.name,
            states: self.states,
            transitions: self.transitions,
            initial,
            variables: self.variables,
        })
    }
}
