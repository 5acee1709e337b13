//! Combinatorial generation of case-arm preconditions.
//!
//! A case arm of a symbolic transition system pairs a precondition,
//! i.e., a conjunction fixing the values of some variables, with the next value of
//! the assigned variable.
//! Since the next value may depend on the current values of the variables,
//! the generator enumerates every combination of their admissible values,
//! and lets the caller compute the next value for each of them.

use crate::domain::{Interval, Value};
use crate::expression::{CmpOp, Comparison};

/// The values a variable can take in a precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// The variable.
    pub var: String,
    /// Its candidate values, in enumeration order.
    pub values: Vec<Value>,
}

/// A partial assignment of values to variables, built during enumeration.
#[derive(Debug, Clone, Default)]
pub struct Valuation<'a> {
    assigned: Vec<(&'a str, Value)>,
}

impl Valuation<'_> {
    /// The value assigned to `var`, if any.
    pub fn get(&self, var: &str) -> Option<Value> {
        self.assigned
            .iter()
            .find(|(assigned, _)| *assigned == var)
            .map(|(_, value)| *value)
    }
}

/// A precondition with the next value it leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseArm<T> {
    /// A conjunction of equalities, in the syntax `a=1 & b=ls`.
    pub precondition: String,
    /// What the caller computed for this combination.
    pub next: T,
}

/// Filters the domain of a variable, keeping only the values satisfying all `comparisons`.
///
/// A sentinel is admissible if some member of the ray it stands for satisfies them.
///
/// ```
/// # use fsmv_core::{admissible, Comparison, CmpOp, Interval, Value};
/// let gt = Comparison { var: "x".to_string(), op: CmpOp::Gt, literal: 1 };
/// assert_eq!(
///     admissible(Interval::new(0, 2), [&gt]),
///     vec![Value::Int(2), Value::Gt]
/// );
/// ```
pub fn admissible<'a>(
    interval: Interval,
    comparisons: impl IntoIterator<Item = &'a Comparison> + Clone,
) -> Vec<Value> {
    interval
        .values()
        .filter(|value| match value {
            Value::Int(value) => comparisons
                .clone()
                .into_iter()
                .all(|comparison| comparison.holds(*value)),
            Value::Ls => ray_satisfies(
                i128::MIN,
                i128::from(interval.min()) - 1,
                comparisons.clone(),
            ),
            Value::Gt => ray_satisfies(
                i128::from(interval.max()) + 1,
                i128::MAX,
                comparisons.clone(),
            ),
        })
        .collect()
}

// Whether some integer in `lo..=hi` satisfies all comparisons.
fn ray_satisfies<'a>(
    mut lo: i128,
    mut hi: i128,
    comparisons: impl IntoIterator<Item = &'a Comparison>,
) -> bool {
    let mut excluded = Vec::new();
    for comparison in comparisons {
        let literal = i128::from(comparison.literal);
        match comparison.op {
            CmpOp::Ge => lo = lo.max(literal),
            CmpOp::Gt => lo = lo.max(literal + 1),
            CmpOp::Le => hi = hi.min(literal),
            CmpOp::Lt => hi = hi.min(literal - 1),
            CmpOp::Eq => {
                lo = lo.max(literal);
                hi = hi.min(literal);
            }
            CmpOp::Ne => excluded.push(literal),
        }
    }
    // Among `excluded.len() + 1` distinct candidates, at least one is not excluded.
    (0..=excluded.len() as i128)
        .map_while(|offset| lo.checked_add(offset).filter(|value| *value <= hi))
        .any(|value| !excluded.contains(&value))
}

/// Enumerates every combination of the `choices`, in order,
/// and pairs the resulting precondition with the value computed by `next`.
///
/// The precondition is `base` conjoined with one equality per choice.
/// Combinations for which `next` returns `None` are pruned.
///
/// ```
/// # use fsmv_core::{generate, Choice, Value};
/// let choices = [
///     Choice { var: "x".to_string(), values: vec![Value::Ls, Value::Int(0)] },
///     Choice { var: "y".to_string(), values: vec![Value::Gt] },
/// ];
/// let arms = generate("state=A", &choices, |valuation| valuation.get("x"));
/// assert_eq!(arms.len(), 2);
/// assert_eq!(arms[0].precondition, "state=A & x=ls & y=gt");
/// assert_eq!(arms[1].next, Value::Int(0));
/// ```
pub fn generate<'a, T>(
    base: &str,
    choices: &'a [Choice],
    mut next: impl FnMut(&Valuation<'a>) -> Option<T>,
) -> Vec<CaseArm<T>> {
    let mut arms = Vec::new();
    let mut valuation = Valuation {
        assigned: Vec::with_capacity(choices.len()),
    };
    let mut precondition = base.to_owned();
    recurse(choices, &mut valuation, &mut precondition, &mut next, &mut arms);
    arms
}

fn recurse<'a, T>(
    choices: &'a [Choice],
    valuation: &mut Valuation<'a>,
    precondition: &mut String,
    next: &mut impl FnMut(&Valuation<'a>) -> Option<T>,
    arms: &mut Vec<CaseArm<T>>,
) {
    let Some((choice, rest)) = choices.split_first() else {
        if let Some(next) = next(valuation) {
            arms.push(CaseArm {
                precondition: precondition.clone(),
                next,
            });
        }
        return;
    };
    let len = precondition.len();
    for value in &choice.values {
        if !precondition.is_empty() {
            precondition.push_str(" & ");
        }
        precondition.push_str(&choice.var);
        precondition.push('=');
        precondition.push_str(&value.to_string());
        valuation.assigned.push((choice.var.as_str(), *value));
        recurse(rest, valuation, precondition, next, arms);
        valuation.assigned.pop();
        precondition.truncate(len);
    }
}
