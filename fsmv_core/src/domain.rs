//! Inference of bounded integer domains for the local variables of an automaton.

use crate::expression::{Action, Update};
use crate::model::Automaton;
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Errors revealing a defect in the translator's own bookkeeping.
#[derive(Debug, Clone, Error)]
pub enum InternalError {
    /// A variable that was discovered had no entry left in the working map.
    #[error("internal error: removing `{0}` from the working domain map returned nothing")]
    MissingEntry(String),
}

/// An element of an enumerable domain.
///
/// The derived ordering puts [`Value::Ls`] before every concrete value,
/// and [`Value::Gt`] after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// Some value below the domain's minimum.
    Ls,
    /// A concrete value within the domain.
    Int(i64),
    /// Some value above the domain's maximum.
    Gt,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Ls => f.write_str("ls"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Gt => f.write_str("gt"),
        }
    }
}

/// A closed integer interval `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    min: i64,
    max: i64,
}

impl Interval {
    /// Creates the interval `min..=max`, swapping the bounds if needed.
    pub const fn new(min: i64, max: i64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Creates the interval containing exactly `value`.
    #[inline(always)]
    pub fn point(value: i64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// The lower bound.
    #[inline(always)]
    pub fn min(&self) -> i64 {
        self.min
    }

    /// The upper bound.
    #[inline(always)]
    pub fn max(&self) -> i64 {
        self.max
    }

    /// The number of concrete values in the interval.
    #[inline(always)]
    pub fn width(&self) -> i64 {
        self.max.saturating_sub(self.min).saturating_add(1)
    }

    /// Whether `value` lies in the interval.
    #[inline(always)]
    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Whether `other` lies entirely in the interval.
    pub fn contains_interval(&self, other: &Interval) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// Extends the interval to contain `value`.
    pub fn extend(&mut self, value: i64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Widens the interval by `span` times its width on either side:
    /// `min - span * (max - min + 1) ..= max + span * (max - min + 1)`.
    ///
    /// ```
    /// # use fsmv_core::Interval;
    /// let interval = Interval::new(2, 4).widen(1);
    /// assert_eq!((interval.min(), interval.max()), (-1, 7));
    /// assert_eq!(Interval::point(1).widen(0), Interval::point(1));
    /// ```
    pub fn widen(self, span: u32) -> Self {
        let delta = self.width().saturating_mul(i64::from(span));
        Self {
            min: self.min.saturating_sub(delta),
            max: self.max.saturating_add(delta),
        }
    }

    /// Maps a concrete value to the domain element representing it,
    /// collapsing out-of-range values onto the sentinels.
    #[inline(always)]
    pub fn classify(&self, value: i64) -> Value {
        if value < self.min {
            Value::Ls
        } else if value > self.max {
            Value::Gt
        } else {
            Value::Int(value)
        }
    }

    /// Enumerates the domain `ls, min, ..., max, gt` in order.
    pub fn values(&self) -> impl Iterator<Item = Value> + use<> {
        std::iter::once(Value::Ls)
            .chain((self.min..=self.max).map(Value::Int))
            .chain(std::iter::once(Value::Gt))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

/// The inferred domains of an automaton's variables and its presence signals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Domains {
    variables: BTreeMap<String, Interval>,
    signals: BTreeSet<String>,
}

impl Domains {
    /// The domain of `var`, if any was inferred.
    #[inline(always)]
    pub fn get(&self, var: &str) -> Option<Interval> {
        self.variables.get(var).copied()
    }

    /// Iterates over variables and their domains, ordered by name.
    pub fn variables(&self) -> impl Iterator<Item = (&str, Interval)> {
        self.variables
            .iter()
            .map(|(name, interval)| (name.as_str(), *interval))
    }

    /// Iterates over the signals tested for presence, whose domain is fixed to `{0,1}`.
    pub fn signals(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(String::as_str)
    }

    /// Whether no variable domain was inferred.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

// Scratch state of one inference call.
#[derive(Default)]
struct Working {
    intervals: HashMap<String, Interval>,
    // Discovery order, used to drain `intervals`.
    discovered: Vec<String>,
}

impl Working {
    fn observe(&mut self, var: &str, literal: i64) {
        if let Some(interval) = self.intervals.get_mut(var) {
            interval.extend(literal);
        } else {
            trace!("seeding domain of `{var}` with {literal}");
            self.intervals.insert(var.to_owned(), Interval::point(literal));
            self.discovered.push(var.to_owned());
        }
    }
}

/// Infers the domain of every variable of a flat automaton.
///
/// States are visited breadth-first from the initial state, each at most once.
/// Every literal compared against, or assigned to, a variable in a reachable transition
/// extends the variable's interval (seeded by the first literal found).
/// Declared initial values extend the intervals of discovered variables.
/// Finally, every interval is widened by `span`.
///
/// Annotated transitions are skipped altogether.
pub fn infer_domains(automaton: &Automaton, span: u32) -> Result<Domains, InternalError> {
    let mut working = Working::default();
    let mut signals = BTreeSet::new();

    for transition in automaton
        .reachable()
        .into_iter()
        .flat_map(|state| automaton.outgoing(state))
    {
        if transition.is_annotated() {
            continue;
        }
        for comparison in transition.guard().comparisons() {
            working.observe(&comparison.var, comparison.literal);
        }
        signals.extend(transition.guard().signals().map(str::to_owned));
        for action in transition.actions() {
            if let Action::Assign(assignment) = action {
                match &assignment.update {
                    Update::Constant(value) => working.observe(&assignment.var, *value),
                    Update::Offset { operand, .. } => {
                        working.observe(&assignment.var, *operand)
                    }
                }
            }
        }
    }

    for (var, init) in automaton.variables() {
        if let Some(interval) = working.intervals.get_mut(var) {
            interval.extend(*init);
        }
    }

    let mut variables = BTreeMap::new();
    for var in working.discovered {
        let interval = working
            .intervals
            .remove(&var)
            .ok_or_else(|| InternalError::MissingEntry(var.clone()))?;
        let widened = interval.widen(span);
        debug!(
            "domain of `{}::{var}`: {interval} widened to {widened}",
            automaton.name()
        );
        variables.insert(var, widened);
    }

    Ok(Domains { variables, signals })
}
