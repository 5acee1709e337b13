//! Classification of guard, set-action and output-action strings.
//!
//! Expressions reach the translator as free text.
//! They are parsed once, when a transition is added to an automaton,
//! into the structured forms [`Guard`], [`Action`] and [`Output`],
//! which are then used by domain inference and by every emitter.
//!
//! The accepted grammar is deliberately small:
//!
//! - guards are flat `&&`-conjunctions of comparisons `var OP literal`
//!   (with `OP` one of `>=`, `<=`, `==`, `!=`, `>`, `<`)
//!   and of signal-presence tests `signal_isPresent`;
//! - set-actions are `;`-separated assignments `var = literal` or `var = other OP literal`
//!   (with `OP` one of `*`, `/`, `+`, `-`);
//! - output-actions are `;`-separated emissions `signal = value`.
//!
//! Anything else is kept as an [`Unsupported`] fragment, so that it can be reported.

use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// Suffix that marks a signal-presence test in a guard.
pub const PRESENCE_SUFFIX: &str = "_isPresent";

/// Comparison operators, in the order in which they are looked for.
const COMPARISONS: [(&str, CmpOp); 6] = [
    (">=", CmpOp::Ge),
    ("<=", CmpOp::Le),
    ("==", CmpOp::Eq),
    ("!=", CmpOp::Ne),
    (">", CmpOp::Gt),
    ("<", CmpOp::Lt),
];

/// Arithmetic operators, in the order in which they are looked for.
const ARITHMETIC: [(char, ArithOp); 4] = [
    ('*', ArithOp::Mul),
    ('/', ArithOp::Div),
    ('+', ArithOp::Add),
    ('-', ArithOp::Sub),
];

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
}

impl CmpOp {
    /// The operator denoting the complement of `self`.
    ///
    /// ```
    /// # use fsmv_core::CmpOp;
    /// assert_eq!(CmpOp::Gt.negate(), CmpOp::Le);
    /// assert_eq!(CmpOp::Eq.negate(), CmpOp::Ne);
    /// ```
    pub fn negate(self) -> Self {
        match self {
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Lt => CmpOp::Ge,
        }
    }

    /// Evaluates `lhs OP rhs`.
    #[inline(always)]
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Lt => lhs < rhs,
        }
    }

    /// The textual symbol of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An arithmetic operator of an offset update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`, integer division truncating toward zero.
    Div,
}

impl ArithOp {
    /// Evaluates `lhs OP rhs`, saturating at the bounds of `i64`.
    ///
    /// Returns `None` only for division by zero.
    pub fn eval(self, lhs: i64, rhs: i64) -> Option<i64> {
        match self {
            ArithOp::Add => Some(lhs.saturating_add(rhs)),
            ArithOp::Sub => Some(lhs.saturating_sub(rhs)),
            ArithOp::Mul => Some(lhs.saturating_mul(rhs)),
            ArithOp::Div => lhs.checked_div(rhs),
        }
    }

    /// The textual symbol of the operator.
    pub fn symbol(self) -> char {
        match self {
            ArithOp::Add => '+',
            ArithOp::Sub => '-',
            ArithOp::Mul => '*',
            ArithOp::Div => '/',
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A bounded comparison `var OP literal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comparison {
    /// The compared local variable.
    pub var: String,
    /// The comparison operator.
    pub op: CmpOp,
    /// The integer literal on the right-hand side.
    pub literal: i64,
}

impl Comparison {
    /// The comparison holding exactly when `self` does not.
    pub fn negate(&self) -> Self {
        Self {
            var: self.var.clone(),
            op: self.op.negate(),
            literal: self.literal,
        }
    }

    /// Whether `value` satisfies the comparison.
    #[inline(always)]
    pub fn holds(&self, value: i64) -> bool {
        self.op.holds(value, self.literal)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.var, self.op, self.literal)
    }
}

/// Reasons for which an expression falls outside of the supported grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Unsupported {
    /// Guards cannot contain `||`.
    #[error("disjunction is not supported")]
    Disjunction,
    /// The right-hand side of a comparison is not an integer literal.
    #[error("right-hand side is not an integer literal")]
    NonLiteral,
    /// The left-hand side of a comparison or assignment is not a plain identifier.
    #[error("left-hand side is not an identifier")]
    NotAnIdentifier,
    /// A guard conjunct has no comparison operator.
    #[error("no comparison operator found")]
    MissingComparison,
    /// An action has no `=`.
    #[error("no assignment found")]
    MissingAssignment,
    /// The right-hand side of an assignment is neither a literal nor `variable OP literal`.
    #[error("right-hand side is neither a literal nor `variable op literal`")]
    ComplexUpdate,
    /// Division by the literal zero.
    #[error("division by zero")]
    DivisionByZero,
    /// The source of an offset update is never compared nor assigned a literal,
    /// so it has no domain to enumerate.
    #[error("source variable has no inferred domain")]
    UndeclaredSource,
}

/// A piece of expression text that could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fragment {
    /// The offending text.
    pub text: String,
    /// Why it is not supported.
    pub reason: Unsupported,
}

impl Fragment {
    fn new(text: &str, reason: Unsupported) -> Self {
        Self {
            text: text.to_owned(),
            reason,
        }
    }
}

/// A single conjunct of a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conjunct {
    /// A bounded comparison on a local variable.
    Comparison(Comparison),
    /// A signal-presence test, holding the signal's name (without suffix).
    Presence(String),
    /// A conjunct outside the supported grammar.
    Unsupported(Fragment),
}

/// A classified guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// The empty guard or the literal `true`:
    /// the transition is enabled by the arrival of any input signal.
    Always,
    /// A flat conjunction.
    Conjunction(SmallVec<[Conjunct; 4]>),
}

impl Guard {
    /// Classifies a guard expression.
    ///
    /// ```
    /// # use fsmv_core::{Conjunct, Guard};
    /// let guard = Guard::parse("P_isPresent && x > 5");
    /// assert_eq!(guard.signals().collect::<Vec<_>>(), vec!["P"]);
    /// assert_eq!(guard.comparisons().count(), 1);
    /// assert!(Guard::parse(" true ").is_always());
    /// ```
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text == "true" {
            return Guard::Always;
        }
        if text.contains("||") {
            return Guard::Conjunction(SmallVec::from_iter([Conjunct::Unsupported(
                Fragment::new(text, Unsupported::Disjunction),
            )]));
        }
        let conjuncts: SmallVec<[Conjunct; 4]> = text
            .split("&&")
            .map(str::trim)
            // `true` is neutral in a conjunction
            .filter(|conjunct| *conjunct != "true")
            .map(parse_conjunct)
            .collect();
        if conjuncts.is_empty() {
            Guard::Always
        } else {
            Guard::Conjunction(conjuncts)
        }
    }

    /// Whether this is the distinguished always-enabled guard.
    #[inline(always)]
    pub fn is_always(&self) -> bool {
        matches!(self, Guard::Always)
    }

    /// Iterates over the conjuncts (none for [`Guard::Always`]).
    pub fn conjuncts(&self) -> impl Iterator<Item = &Conjunct> {
        let conjuncts: &[Conjunct] = match self {
            Guard::Always => &[],
            Guard::Conjunction(conjuncts) => conjuncts,
        };
        conjuncts.iter()
    }

    /// Iterates over the bounded comparisons.
    pub fn comparisons(&self) -> impl Iterator<Item = &Comparison> {
        self.conjuncts().filter_map(|conjunct| match conjunct {
            Conjunct::Comparison(comparison) => Some(comparison),
            _ => None,
        })
    }

    /// Iterates over the names of the signals whose presence is tested.
    pub fn signals(&self) -> impl Iterator<Item = &str> {
        self.conjuncts().filter_map(|conjunct| match conjunct {
            Conjunct::Presence(signal) => Some(signal.as_str()),
            _ => None,
        })
    }

    /// Iterates over the unsupported fragments.
    pub fn unsupported(&self) -> impl Iterator<Item = &Fragment> {
        self.conjuncts().filter_map(|conjunct| match conjunct {
            Conjunct::Unsupported(fragment) => Some(fragment),
            _ => None,
        })
    }
}

/// How an assignment computes the new value of its variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Update {
    /// `var = literal`
    Constant(i64),
    /// `var = source OP operand`
    Offset {
        /// The variable read by the update (possibly the assigned one).
        source: String,
        /// The arithmetic operator.
        op: ArithOp,
        /// The constant operand.
        operand: i64,
    },
}

/// An assignment to a local variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assignment {
    /// The assigned variable.
    pub var: String,
    /// The assigned value.
    pub update: Update,
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.update {
            Update::Constant(value) => write!(f, "{} = {value}", self.var),
            Update::Offset {
                source,
                op,
                operand,
            } => write!(f, "{} = {source} {op} {operand}", self.var),
        }
    }
}

/// A classified set-action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A supported assignment.
    Assign(Assignment),
    /// An action outside the supported grammar.
    Unsupported(Fragment),
}

/// The set-actions of a transition.
pub type Actions = SmallVec<[Action; 2]>;

/// Classifies a `;`-separated list of set-actions.
///
/// ```
/// # use fsmv_core::{parse_actions, Action, ArithOp, Update};
/// let actions = parse_actions("x = 1; y = y + (-2)");
/// let Action::Assign(assignment) = &actions[1] else { panic!() };
/// assert_eq!(
///     assignment.update,
///     Update::Offset { source: "y".to_string(), op: ArithOp::Add, operand: -2 }
/// );
/// ```
pub fn parse_actions(text: &str) -> Actions {
    text.split(';')
        .map(str::trim)
        .filter(|action| !action.is_empty())
        .map(parse_action)
        .collect()
}

/// A signal emitted by an output-action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Emission {
    /// The emitted signal.
    pub signal: String,
    /// The emitted value, as written.
    pub value: String,
}

/// A classified output-action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// A supported emission.
    Emit(Emission),
    /// An output-action outside the supported grammar.
    Unsupported(Fragment),
}

/// The output-actions of a transition.
pub type Outputs = SmallVec<[Output; 2]>;

/// Classifies a `;`-separated list of output-actions.
pub fn parse_outputs(text: &str) -> Outputs {
    text.split(';')
        .map(str::trim)
        .filter(|output| !output.is_empty())
        .map(|output| match output.split_once('=') {
            Some((signal, value)) if is_identifier(signal.trim()) => Output::Emit(Emission {
                signal: signal.trim().to_owned(),
                value: value.trim().to_owned(),
            }),
            Some(_) => Output::Unsupported(Fragment::new(output, Unsupported::NotAnIdentifier)),
            None => Output::Unsupported(Fragment::new(output, Unsupported::MissingAssignment)),
        })
        .collect()
}

fn parse_conjunct(conjunct: &str) -> Conjunct {
    match find_comparison(conjunct) {
        Some((pos, op)) => {
            let lhs = conjunct[..pos].trim();
            let rhs = conjunct[pos + op.symbol().len()..].trim();
            if let Some(signal) = presence(lhs) {
                Conjunct::Presence(signal.to_owned())
            } else if !is_identifier(lhs) {
                Conjunct::Unsupported(Fragment::new(conjunct, Unsupported::NotAnIdentifier))
            } else if let Some(literal) = parse_literal(rhs) {
                Conjunct::Comparison(Comparison {
                    var: lhs.to_owned(),
                    op,
                    literal,
                })
            } else {
                Conjunct::Unsupported(Fragment::new(conjunct, Unsupported::NonLiteral))
            }
        }
        None => match presence(conjunct) {
            Some(signal) => Conjunct::Presence(signal.to_owned()),
            None => Conjunct::Unsupported(Fragment::new(conjunct, Unsupported::MissingComparison)),
        },
    }
}

// Position and kind of the first comparison operator,
// testing two-character operators before single-character ones at each position.
fn find_comparison(text: &str) -> Option<(usize, CmpOp)> {
    text.char_indices().find_map(|(pos, _)| {
        COMPARISONS
            .iter()
            .find(|(symbol, _)| text[pos..].starts_with(symbol))
            .map(|&(_, op)| (pos, op))
    })
}

fn presence(lhs: &str) -> Option<&str> {
    lhs.strip_suffix(PRESENCE_SUFFIX)
        .filter(|signal| is_identifier(signal))
}

fn parse_action(action: &str) -> Action {
    let Some((var, rhs)) = action.split_once('=') else {
        return Action::Unsupported(Fragment::new(action, Unsupported::MissingAssignment));
    };
    let var = var.trim();
    if !is_identifier(var) {
        return Action::Unsupported(Fragment::new(action, Unsupported::NotAnIdentifier));
    }
    let rhs = rhs.trim();
    if let Some(value) = parse_literal(rhs) {
        return Action::Assign(Assignment {
            var: var.to_owned(),
            update: Update::Constant(value),
        });
    }
    for (symbol, op) in ARITHMETIC {
        let Some((source, operand)) = rhs.split_once(symbol) else {
            continue;
        };
        let source = source.trim();
        if let (true, Some(operand)) = (is_identifier(source), parse_literal(operand)) {
            if op == ArithOp::Div && operand == 0 {
                return Action::Unsupported(Fragment::new(action, Unsupported::DivisionByZero));
            }
            return Action::Assign(Assignment {
                var: var.to_owned(),
                update: Update::Offset {
                    source: source.to_owned(),
                    op,
                    operand,
                },
            });
        }
    }
    Action::Unsupported(Fragment::new(action, Unsupported::ComplexUpdate))
}

/// Parses an integer literal, possibly signed and wrapped in one pair of parentheses,
/// as in `(-3)`.
pub fn parse_literal(text: &str) -> Option<i64> {
    let text = text.trim();
    let text = text
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(text)
        .trim();
    text.parse().ok()
}

/// Whether `text` is a plain identifier `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
