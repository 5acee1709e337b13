//! The input model: automata with states and guarded transitions,
//! primitive timed actors, and the system composing them.

mod builder;

use crate::expression::{Action, Actions, Fragment, Guard, Output, Outputs};
pub use builder::{AutomatonBuilder, Label};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use thiserror::Error;

pub(crate) type StateIdx = u32;

/// The index of a state within its automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub(crate) StateIdx);

impl StateId {
    #[inline(always)]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Errors raised while building an [`Automaton`].
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Two states with the same name.
    #[error("state `{0}` already exists in automaton `{1}`")]
    DuplicateState(String, String),
    /// Two transitions with the same name.
    #[error("transition `{0}` already exists in automaton `{1}`")]
    DuplicateTransition(String, String),
    /// Two declarations of the same variable.
    #[error("variable `{0}` already declared in automaton `{1}`")]
    DuplicateVariable(String, String),
    /// A state id that does not belong to the automaton.
    #[error("state {0:?} not found in automaton `{1}`")]
    MissingState(StateId, String),
    /// No state is marked initial.
    #[error("automaton `{0}` has no initial state")]
    NoInitialState(String),
    /// More than one state is marked initial.
    #[error("automaton `{0}` has more than one initial state: `{1}` and `{2}`")]
    MultipleInitialStates(String, String, String),
}

/// A state, possibly refined by nested automata.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    name: String,
    initial: bool,
    refinements: Vec<Automaton>,
}

impl State {
    /// The name of the state, unique within its automaton.
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the initial state.
    #[inline(always)]
    pub fn is_initial(&self) -> bool {
        self.initial
    }

    /// The automata refining this state.
    ///
    /// A well-formed hierarchical model has at most one.
    #[inline(always)]
    pub fn refinements(&self) -> &[Automaton] {
        &self.refinements
    }
}

/// A guarded transition, with its expressions already classified.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    name: String,
    source: StateId,
    target: StateId,
    guard: Guard,
    actions: Actions,
    outputs: Outputs,
    annotation: Option<String>,
}

impl Transition {
    /// The transition's name.
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source state.
    #[inline(always)]
    pub fn source(&self) -> StateId {
        self.source
    }

    /// The destination state.
    #[inline(always)]
    pub fn target(&self) -> StateId {
        self.target
    }

    /// The classified guard.
    #[inline(always)]
    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// The classified set-actions.
    #[inline(always)]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// The classified output-actions.
    #[inline(always)]
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// The annotation, if any.
    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    /// Annotated transitions opt out of guard and set-action interpretation.
    #[inline(always)]
    pub fn is_annotated(&self) -> bool {
        self.annotation.is_some()
    }

    /// Iterates over the names of the emitted signals.
    pub fn emitted(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().filter_map(|output| match output {
            Output::Emit(emission) => Some(emission.signal.as_str()),
            Output::Unsupported(_) => None,
        })
    }

    fn unsupported(&self) -> impl Iterator<Item = &Fragment> {
        let interpreted = !self.is_annotated();
        let guard = self.guard.unsupported().filter(move |_| interpreted);
        let actions = self.actions.iter().filter_map(move |action| match action {
            Action::Unsupported(fragment) if interpreted => Some(fragment),
            _ => None,
        });
        let outputs = self.outputs.iter().filter_map(|output| match output {
            Output::Unsupported(fragment) => Some(fragment),
            Output::Emit(_) => None,
        });
        guard.chain(actions).chain(outputs)
    }
}

/// An expression that falls outside of the supported grammar,
/// located by automaton and transition.
///
/// It is recoverable: the offending conjunct or action is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported expression `{expression}` in transition `{transition}` of `{automaton}`: {reason}")]
pub struct UnsupportedExpression {
    /// The automaton owning the transition.
    pub automaton: String,
    /// The transition carrying the expression.
    pub transition: String,
    /// The offending text.
    pub expression: String,
    /// Why it is not supported.
    pub reason: crate::expression::Unsupported,
}

/// A finite-state machine, possibly hierarchical.
#[derive(Debug, Clone, PartialEq)]
pub struct Automaton {
    name: String,
    states: Vec<State>,
    transitions: Vec<Transition>,
    initial: StateId,
    variables: BTreeMap<String, i64>,
}

impl Automaton {
    /// The automaton's name.
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The states, in declaration order.
    #[inline(always)]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// The transitions, in declaration order.
    #[inline(always)]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// The initial state.
    #[inline(always)]
    pub fn initial(&self) -> StateId {
        self.initial
    }

    /// Gets the state with the given id.
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id.index())
    }

    /// Gets the name of the state with the given id.
    ///
    /// Ids handed out by this automaton are always valid.
    pub fn state_name(&self, id: StateId) -> &str {
        self.states
            .get(id.index())
            .map(State::name)
            .unwrap_or_default()
    }

    /// Looks up a state by name.
    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .position(|state| state.name == name)
            .map(|idx| StateId(idx as StateIdx))
    }

    /// Iterates over the ids of all states.
    pub fn state_ids(&self) -> impl Iterator<Item = StateId> + use<> {
        (0..self.states.len() as StateIdx).map(StateId)
    }

    /// Iterates over the transitions leaving `state`.
    pub fn outgoing(&self, state: StateId) -> impl Iterator<Item = &Transition> {
        self.transitions
            .iter()
            .filter(move |transition| transition.source == state)
    }

    /// The states reachable from the initial state, in breadth-first order.
    ///
    /// Annotated transitions count, since they are always enabled.
    pub fn reachable(&self) -> Vec<StateId> {
        let mut visited = vec![false; self.states.len()];
        let mut order = Vec::with_capacity(self.states.len());
        let mut frontier = VecDeque::from([self.initial]);
        visited[self.initial.index()] = true;
        while let Some(state) = frontier.pop_front() {
            order.push(state);
            for transition in self.outgoing(state) {
                let target = transition.target.index();
                if !visited[target] {
                    visited[target] = true;
                    frontier.push_back(transition.target);
                }
            }
        }
        order
    }

    /// The declared variables with their initial values.
    #[inline(always)]
    pub fn variables(&self) -> &BTreeMap<String, i64> {
        &self.variables
    }

    /// Whether any state has a refinement.
    pub fn is_hierarchical(&self) -> bool {
        self.states.iter().any(|state| !state.refinements.is_empty())
    }

    /// Signals whose presence is tested by some interpreted guard.
    pub fn input_signals(&self) -> BTreeSet<&str> {
        self.transitions
            .iter()
            .filter(|transition| !transition.is_annotated())
            .flat_map(|transition| transition.guard.signals())
            .collect()
    }

    /// Signals emitted by some output-action.
    pub fn output_signals(&self) -> BTreeSet<&str> {
        self.transitions
            .iter()
            .flat_map(Transition::emitted)
            .collect()
    }

    /// Collects every expression outside of the supported grammar.
    pub fn diagnostics(&self) -> Vec<UnsupportedExpression> {
        self.transitions
            .iter()
            .flat_map(|transition| {
                transition
                    .unsupported()
                    .map(|fragment| UnsupportedExpression {
                        automaton: self.name.clone(),
                        transition: transition.name.clone(),
                        expression: fragment.text.clone(),
                        reason: fragment.reason,
                    })
            })
            .collect()
    }
}

/// Periodic clock source.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockActor {
    /// The actor's name.
    pub name: String,
    /// Time between two ticks.
    pub period: f64,
    /// Time after which the clock stops, if any.
    pub stop_time: Option<f64>,
    /// Number of ticks after which the clock stops, if any.
    pub cycles: Option<u32>,
    /// The signal emitted at every tick.
    pub output: String,
}

/// How long a delay buffer holds its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelayKind {
    /// Tokens are released exactly after the delay.
    Timed,
    /// Tokens are released at any time within the delay.
    Nondeterministic,
}

/// Bounded buffer delaying the tokens it receives.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayActor {
    /// The actor's name.
    pub name: String,
    /// Timed or non-deterministic release.
    pub kind: DelayKind,
    /// The delay.
    pub delay: f64,
    /// The number of tokens the buffer can hold.
    pub buffer_size: u32,
    /// The received signal.
    pub input: String,
    /// The emitted signal.
    pub output: String,
}

/// An entity of a [`System`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A finite-state machine, possibly hierarchical.
    Fsm(Automaton),
    /// A clock source.
    Clock(ClockActor),
    /// A delay buffer.
    Delay(DelayActor),
}

impl Entity {
    /// The entity's name.
    pub fn name(&self) -> &str {
        match self {
            Entity::Fsm(automaton) => automaton.name(),
            Entity::Clock(clock) => &clock.name,
            Entity::Delay(delay) => &delay.name,
        }
    }
}

/// Execution semantics declared by the host model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantics {
    /// Synchronous reactive.
    SynchronousReactive,
    /// Discrete event.
    DiscreteEvent,
}

impl fmt::Display for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Semantics::SynchronousReactive => f.write_str("synchronous reactive"),
            Semantics::DiscreteEvent => f.write_str("discrete event"),
        }
    }
}

/// A composition of entities communicating through named signals.
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    /// The system's name.
    pub name: String,
    /// The declared execution semantics, if any.
    pub semantics: Option<Semantics>,
    /// The entities, in declaration order.
    pub entities: Vec<Entity>,
}

impl System {
    /// Iterates over the finite-state machines.
    pub fn automata(&self) -> impl Iterator<Item = &Automaton> {
        self.entities.iter().filter_map(|entity| match entity {
            Entity::Fsm(automaton) => Some(automaton),
            _ => None,
        })
    }
}
