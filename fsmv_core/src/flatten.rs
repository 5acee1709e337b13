//! Flattening of two-level hierarchical automata into plain ones.

use crate::model::{Automaton, AutomatonBuilder, ModelError, Semantics, StateId};
use log::{debug, trace};
use thiserror::Error;

/// Fatal errors in the structure of a model.
#[derive(Debug, Clone, Error)]
pub enum StructuralError {
    /// A refinement is itself hierarchical.
    #[error(
        "state `{state}` of `{automaton}` is refined by a hierarchical automaton, only one level of nesting is supported"
    )]
    NestedRefinement {
        /// The parent automaton.
        automaton: String,
        /// The refined state.
        state: String,
    },
    /// A state has more than one refinement.
    #[error("state `{state}` of `{automaton}` has {count} refinements, at most one is supported")]
    MultipleRefinements {
        /// The parent automaton.
        automaton: String,
        /// The refined state.
        state: String,
        /// How many refinements were found.
        count: usize,
    },
    /// A state has no counterpart in the flat automaton.
    #[error("state {state} of `{automaton}` has no flat counterpart")]
    MissingState {
        /// The parent automaton.
        automaton: String,
        /// The offending state.
        state: String,
    },
    /// The declared execution semantics does not fit the target.
    #[error("`{system}` declares {found} semantics, but the target requires {expected} semantics")]
    IncompatibleSemantics {
        /// The system.
        system: String,
        /// The semantics required by the target.
        expected: Semantics,
        /// The declared semantics.
        found: Semantics,
    },
    /// A timed actor is not connected to any signal.
    #[error("port `{port}` of `{entity}` is not connected to any signal")]
    MissingSignal {
        /// The timed actor.
        entity: String,
        /// The unconnected port.
        port: &'static str,
    },
    /// Two distinct names map to the same identifier of the target language.
    #[error("`{first}` and `{second}` in `{scope}` both become the identifier `{ident}`")]
    IdentifierClash {
        /// The automaton or system owning the names.
        scope: String,
        /// The name seen first.
        first: String,
        /// The clashing name.
        second: String,
        /// The shared identifier.
        ident: String,
    },
    /// Building the flat automaton failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

// Where a state of the hierarchical automaton ended up.
enum Flat {
    Plain(StateId),
    Refined {
        states: Vec<(StateId, String)>,
        initial: StateId,
    },
}

impl Flat {
    // The state a transition entering the original state lands in.
    fn entry(&self) -> StateId {
        match self {
            Flat::Plain(id) => *id,
            Flat::Refined { initial, .. } => *initial,
        }
    }
}

/// Flattens a two-level hierarchical automaton.
///
/// The states of a refinement `R` of `S` become `S-r`,
/// and its transitions become `S-t`.
/// Each transition `T` of the parent is then rewired:
/// entering `S` means entering `R`'s initial state,
/// and leaving `S` is possible from every state of `R`,
/// through one clone of `T` named `T-from-S-r` per state.
///
/// Automata with no refinements are returned unchanged.
///
/// ```
/// # use fsmv_core::{flatten, AutomatonBuilder, Label};
/// let mut inner = AutomatonBuilder::new("Inner");
/// let on = inner.new_initial_state("on").unwrap();
/// let off = inner.new_state("off").unwrap();
/// inner.add_transition("toggle", on, off, Label::new()).unwrap();
///
/// let mut outer = AutomatonBuilder::new("Outer");
/// let idle = outer.new_initial_state("Idle").unwrap();
/// let run = outer.new_state("Run").unwrap();
/// outer.add_refinement(run, inner.build().unwrap()).unwrap();
/// outer.add_transition("start", idle, run, Label::new()).unwrap();
///
/// let flat = flatten(&outer.build().unwrap()).unwrap();
/// let names: Vec<_> = flat.states().iter().map(|s| s.name()).collect();
/// assert_eq!(names, ["Idle", "Run-on", "Run-off"]);
/// assert_eq!(flat.state_name(flat.transitions()[1].target()), "Run-on");
/// ```
pub fn flatten(automaton: &Automaton) -> Result<Automaton, StructuralError> {
    if !automaton.is_hierarchical() {
        trace!("`{}` is already flat", automaton.name());
        return Ok(automaton.clone());
    }

    let mut builder = AutomatonBuilder::new(automaton.name());
    builder.merge_variables(automaton.variables());

    let mut flat = Vec::with_capacity(automaton.states().len());
    for state in automaton.states() {
        match state.refinements() {
            [] => flat.push(Flat::Plain(
                builder.push_state(state.name().to_owned(), state.is_initial())?,
            )),
            [refinement] => {
                if refinement.is_hierarchical() {
                    return Err(StructuralError::NestedRefinement {
                        automaton: automaton.name().to_owned(),
                        state: state.name().to_owned(),
                    });
                }
                debug!(
                    "flattening refinement `{}` of `{}::{}`",
                    refinement.name(),
                    automaton.name(),
                    state.name()
                );
                let mut states = Vec::with_capacity(refinement.states().len());
                for inner in refinement.states() {
                    let name = format!("{}-{}", state.name(), inner.name());
                    let id = builder
                        .push_state(name.clone(), state.is_initial() && inner.is_initial())?;
                    states.push((id, name));
                }
                let missing = |id: StateId| StructuralError::MissingState {
                    automaton: refinement.name().to_owned(),
                    state: refinement.state_name(id).to_owned(),
                };
                let lookup = |id: StateId| {
                    states
                        .get(id.index())
                        .map(|(flat_id, _)| *flat_id)
                        .ok_or_else(|| missing(id))
                };
                for transition in refinement.transitions() {
                    builder.copy_transition(
                        format!("{}-{}", state.name(), transition.name()),
                        lookup(transition.source())?,
                        lookup(transition.target())?,
                        transition,
                    )?;
                }
                let initial = lookup(refinement.initial())?;
                builder.merge_variables(refinement.variables());
                flat.push(Flat::Refined { states, initial });
            }
            refinements => {
                return Err(StructuralError::MultipleRefinements {
                    automaton: automaton.name().to_owned(),
                    state: state.name().to_owned(),
                    count: refinements.len(),
                });
            }
        }
    }

    let missing = |id: StateId| StructuralError::MissingState {
        automaton: automaton.name().to_owned(),
        state: automaton.state_name(id).to_owned(),
    };
    for transition in automaton.transitions() {
        let source = flat
            .get(transition.source().index())
            .ok_or_else(|| missing(transition.source()))?;
        let target = flat
            .get(transition.target().index())
            .ok_or_else(|| missing(transition.target()))?
            .entry();
        match source {
            Flat::Plain(source) => {
                builder.copy_transition(transition.name().to_owned(), *source, target, transition)?
            }
            Flat::Refined { states, .. } => {
                for (source, name) in states {
                    builder.copy_transition(
                        format!("{}-from-{name}", transition.name()),
                        *source,
                        target,
                        transition,
                    )?;
                }
            }
        }
    }

    Ok(builder.build()?)
}
