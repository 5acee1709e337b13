//! The meaning of a transition, independent of the target syntax.
//!
//! Both emitters first encode the transitions of a flat automaton into
//! [`TransitionEncoding`]s and then render them in their own grammar.
//! The timed-automata target additionally needs the edges of a whole state,
//! including the synthesized still moves, which [`encode_state`] provides.

use crate::expression::{Action, Assignment, Comparison};
use crate::model::{Automaton, StateId, Transition};
use log::trace;
use std::collections::{BTreeMap, BTreeSet};

/// One edge of a flat automaton, as the emitters understand it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEncoding {
    /// The name of the originating transition.
    pub name: String,
    /// The source state.
    pub source: StateId,
    /// The destination state.
    pub target: StateId,
    /// Whether the guard is the always-enabled one.
    pub always: bool,
    /// Signals whose tokens are consumed.
    pub inputs: BTreeSet<String>,
    /// Signals emitted.
    pub outputs: BTreeSet<String>,
    /// Conjunction of comparisons on local variables.
    pub preconditions: Vec<Comparison>,
    /// Assignments, in order.
    pub updates: Vec<Assignment>,
    /// Whether this is a synthesized still move.
    pub complementary: bool,
    /// For still moves: a conjunction of disjunctions of comparisons,
    /// each disjunction negating the guard of a sibling edge.
    pub negated: Vec<Vec<Comparison>>,
}

impl TransitionEncoding {
    /// The negation of the comparisons of the guard,
    /// as a disjunction of flipped comparisons.
    ///
    /// It is empty if the guard has no comparisons, i.e., cannot be false
    /// once its input tokens are available.
    pub fn negation(&self) -> Vec<Comparison> {
        self.preconditions.iter().map(Comparison::negate).collect()
    }

    fn still_move(state: StateId, inputs: BTreeSet<String>, negated: Vec<Vec<Comparison>>) -> Self {
        Self {
            name: String::new(),
            source: state,
            target: state,
            always: false,
            inputs,
            outputs: BTreeSet::new(),
            preconditions: Vec::new(),
            updates: Vec::new(),
            complementary: true,
            negated,
        }
    }
}

/// Encodes a transition.
///
/// Annotated transitions keep their outputs,
/// but their guard is taken to be always enabled and their set-actions are ignored.
/// Unsupported fragments are left out.
pub fn encode(transition: &Transition) -> TransitionEncoding {
    let interpreted = !transition.is_annotated();
    let guard = transition.guard();
    TransitionEncoding {
        name: transition.name().to_owned(),
        source: transition.source(),
        target: transition.target(),
        always: !interpreted || guard.is_always(),
        inputs: if interpreted {
            guard.signals().map(str::to_owned).collect()
        } else {
            BTreeSet::new()
        },
        outputs: transition.emitted().map(str::to_owned).collect(),
        preconditions: if interpreted {
            guard.comparisons().cloned().collect()
        } else {
            Vec::new()
        },
        updates: transition
            .actions()
            .iter()
            .filter(|_| interpreted)
            .filter_map(|action| match action {
                Action::Assign(assignment) => Some(assignment.clone()),
                Action::Unsupported(_) => None,
            })
            .collect(),
        complementary: false,
        negated: Vec::new(),
    }
}

/// Encodes every edge leaving `state`, as needed by a token-based composition.
///
/// - An always-enabled edge is expanded into one edge per signal of `inputs`
///   (or kept as a single unsynchronized edge if there are none).
/// - Edges consuming the same set of signals form a group.
///   If every edge of a group may be disabled by its comparisons,
///   a still move consumes the same signals when none of them is enabled.
/// - Every signal of `inputs` that no edge consumes gets an unconditional still move.
///
/// Still moves come after the regular edges.
pub fn encode_state(
    automaton: &Automaton,
    state: StateId,
    inputs: &BTreeSet<&str>,
) -> Vec<TransitionEncoding> {
    let mut edges = Vec::new();
    for transition in automaton.outgoing(state) {
        let encoding = encode(transition);
        if encoding.always && !inputs.is_empty() {
            for input in inputs {
                edges.push(TransitionEncoding {
                    inputs: BTreeSet::from([(*input).to_owned()]),
                    ..encoding.clone()
                });
            }
        } else {
            edges.push(encoding);
        }
    }

    let mut groups: BTreeMap<&BTreeSet<String>, Vec<&TransitionEncoding>> = BTreeMap::new();
    for edge in edges.iter().filter(|edge| !edge.inputs.is_empty()) {
        groups.entry(&edge.inputs).or_default().push(edge);
    }
    let mut still_moves = Vec::new();
    for (group_inputs, group) in &groups {
        let negated: Vec<_> = group.iter().map(|edge| edge.negation()).collect();
        if negated.iter().all(|negation| !negation.is_empty()) {
            trace!(
                "still move out of `{}::{}` on {group_inputs:?}",
                automaton.name(),
                automaton.state_name(state)
            );
            still_moves.push(TransitionEncoding::still_move(
                state,
                (*group_inputs).clone(),
                negated,
            ));
        }
    }

    let consumed: BTreeSet<&str> = edges
        .iter()
        .flat_map(|edge| edge.inputs.iter().map(String::as_str))
        .collect();
    for input in inputs.difference(&consumed) {
        still_moves.push(TransitionEncoding::still_move(
            state,
            BTreeSet::from([(*input).to_owned()]),
            Vec::new(),
        ));
    }

    edges.extend(still_moves);
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AutomatonBuilder, Label};

    #[test]
    fn annotated_transition() {
        let mut builder = AutomatonBuilder::new("M");
        let a = builder.new_initial_state("A").unwrap();
        builder
            .add_transition(
                "t",
                a,
                a,
                Label::new()
                    .guard("P_isPresent && x > 1")
                    .set("x = 0")
                    .output("done = 1")
                    .annotation("manual"),
            )
            .unwrap();
        let automaton = builder.build().unwrap();
        let encoding = encode(&automaton.transitions()[0]);
        assert!(encoding.always);
        assert!(encoding.inputs.is_empty());
        assert!(encoding.preconditions.is_empty());
        assert!(encoding.updates.is_empty());
        assert_eq!(encoding.outputs, BTreeSet::from(["done".to_owned()]));
    }

    #[test]
    fn still_moves() {
        let mut builder = AutomatonBuilder::new("N");
        let s = builder.new_initial_state("S").unwrap();
        let t = builder.new_state("T").unwrap();
        builder
            .add_transition("up", s, t, Label::new().guard("P_isPresent && x > 5"))
            .unwrap();
        builder
            .add_transition("down", s, t, Label::new().guard("P_isPresent && x < 0"))
            .unwrap();
        builder
            .add_transition("back", t, s, Label::new().guard("Q_isPresent"))
            .unwrap();
        let automaton = builder.build().unwrap();
        let inputs = automaton.input_signals();

        let edges = encode_state(&automaton, s, &inputs);
        let still: Vec<_> = edges.iter().filter(|e| e.complementary).collect();
        assert_eq!(still.len(), 2);
        // P: neither `x > 5` nor `x < 0`
        assert_eq!(still[0].inputs, BTreeSet::from(["P".to_owned()]));
        assert_eq!(still[0].negated.len(), 2);
        assert_eq!(still[0].negated[0][0].to_string(), "x <= 5");
        assert_eq!(still[0].negated[1][0].to_string(), "x >= 0");
        // Q is not consumed in S at all
        assert_eq!(still[1].inputs, BTreeSet::from(["Q".to_owned()]));
        assert!(still[1].negated.is_empty());
        assert!(still.iter().all(|e| e.target == s));

        // `back` cannot be disabled once Q is there, and P is not consumed in T
        let edges = encode_state(&automaton, t, &inputs);
        let still: Vec<_> = edges.iter().filter(|e| e.complementary).collect();
        assert_eq!(still.len(), 1);
        assert_eq!(still[0].inputs, BTreeSet::from(["P".to_owned()]));
    }

    #[test]
    fn always_guard_expansion() {
        let mut builder = AutomatonBuilder::new("N");
        let s = builder.new_initial_state("S").unwrap();
        builder
            .add_transition("tick", s, s, Label::new().guard("true").set("x = x + 1"))
            .unwrap();
        builder
            .add_transition("reset", s, s, Label::new().guard("R_isPresent && x > 3"))
            .unwrap();
        let automaton = builder.build().unwrap();
        let inputs = automaton.input_signals();
        let edges = encode_state(&automaton, s, &inputs);
        // `tick` on R, `reset`, and no still move since `tick` is never disabled
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| !e.complementary));

        let no_inputs = BTreeSet::new();
        let edges = encode_state(&automaton, s, &no_inputs);
        assert!(edges.iter().any(|e| e.name == "tick" && e.inputs.is_empty()));
    }
}
