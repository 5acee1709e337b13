//! Core of the FSMV translator from hierarchical finite-state machines
//! to the input languages of formal verification tools:
//! symbolic transition systems (Kripke structures)[^1] and communicating timed automata.
//!
//! This crate provides the target-independent machinery:
//! the [`Automaton`] model and its [`AutomatonBuilder`],
//! the classification of textual guards and actions ([`Guard`], [`Action`], [`Output`]),
//! the [`flatten`]ing of hierarchical automata,
//! the inference of bounded variable domains ([`infer_domains`]),
//! sentinel-aware arithmetic ([`apply`]),
//! the enumeration of case-arm preconditions ([`generate`]),
//! and the target-independent [`TransitionEncoding`] of edges.
//!
//! [^1]: Baier, C., & Katoen, J. (2008). *Principles of model checking*. MIT Press.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod arith;
mod domain;
mod encoding;
mod expression;
mod flatten;
pub mod model;
mod precondition;

pub use arith::apply;
pub use domain::{Domains, InternalError, Interval, Value, infer_domains};
pub use encoding::{TransitionEncoding, encode, encode_state};
pub use expression::{
    Action, Actions, ArithOp, Assignment, CmpOp, Comparison, Conjunct, Emission, Fragment, Guard,
    Output, Outputs, PRESENCE_SUFFIX, Unsupported, Update, is_identifier, parse_actions,
    parse_literal, parse_outputs,
};
pub use flatten::{StructuralError, flatten};
use log::{debug, info, warn};
pub use model::{
    Automaton, AutomatonBuilder, ClockActor, DelayActor, DelayKind, Entity, Label, ModelError,
    Semantics, State, StateId, System, Transition, UnsupportedExpression,
};
pub use precondition::{CaseArm, Choice, Valuation, admissible, generate};
use std::time::Instant;
use thiserror::Error;

/// Any error aborting a translation.
#[derive(Debug, Clone, Error)]
pub enum TranslationError {
    /// The model could not be built.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// The model's structure is not supported.
    #[error(transparent)]
    Structural(#[from] StructuralError),
    /// The translator's bookkeeping is inconsistent.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// A flat automaton ready for emission.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// The flattened automaton.
    pub automaton: Automaton,
    /// The inferred domains of its variables.
    pub domains: Domains,
    /// The expressions that were left out.
    pub diagnostics: Vec<UnsupportedExpression>,
}

/// Flattens an automaton, infers the domains of its variables
/// and collects the unsupported expressions, logging each of them.
///
/// Offset updates reading a variable without a domain are reported as well:
/// emitters leave them out.
///
/// ```
/// # use fsmv_core::{prepare, AutomatonBuilder, Interval, Label};
/// let mut builder = AutomatonBuilder::new("M");
/// let a = builder.new_initial_state("A").unwrap();
/// let b = builder.new_state("B").unwrap();
/// builder.add_transition("t", a, b, Label::new().guard("x == 1")).unwrap();
/// let prepared = prepare(&builder.build().unwrap(), 0).unwrap();
/// assert_eq!(prepared.domains.get("x"), Some(Interval::point(1)));
/// assert!(prepared.diagnostics.is_empty());
/// ```
pub fn prepare(automaton: &Automaton, span: u32) -> Result<Prepared, TranslationError> {
    let time = Instant::now();
    let automaton = flatten(automaton)?;
    let domains = infer_domains(&automaton, span)?;
    let mut diagnostics = automaton.diagnostics();
    diagnostics.extend(undeclared_sources(&automaton, &domains));
    for diagnostic in &diagnostics {
        warn!("{diagnostic}");
    }
    debug!(
        "`{}`: {} states, {} variables, {} signals",
        automaton.name(),
        automaton.states().len(),
        domains.variables().count(),
        domains.signals().count()
    );
    info!(target: "prepare", "prepared `{}` in {:?}", automaton.name(), time.elapsed());
    Ok(Prepared {
        automaton,
        domains,
        diagnostics,
    })
}

// Offset updates of reachable transitions whose source has no domain.
fn undeclared_sources(automaton: &Automaton, domains: &Domains) -> Vec<UnsupportedExpression> {
    automaton
        .reachable()
        .into_iter()
        .flat_map(|state| automaton.outgoing(state))
        .filter(|transition| !transition.is_annotated())
        .flat_map(|transition| {
            transition.actions().iter().filter_map(move |action| match action {
                Action::Assign(assignment) => match &assignment.update {
                    Update::Offset { source, .. } if domains.get(source).is_none() => {
                        Some(UnsupportedExpression {
                            automaton: automaton.name().to_owned(),
                            transition: transition.name().to_owned(),
                            expression: assignment.to_string(),
                            reason: Unsupported::UndeclaredSource,
                        })
                    }
                    _ => None,
                },
                Action::Unsupported(_) => None,
            })
        })
        .collect()
}
