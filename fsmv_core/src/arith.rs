//! Sentinel-aware arithmetic over enumerable domains.
//!
//! A sentinel stands for a whole integer ray of the source domain:
//! [`Value::Ls`] for `(-∞, min-1]` and [`Value::Gt`] for `[max+1, +∞)`.
//! Applying an offset update to a sentinel maps the ray through the operation,
//! and the image is then folded back onto the target domain:
//! members below the target's minimum become [`Value::Ls`],
//! members above its maximum become [`Value::Gt`],
//! and the remaining ones are enumerated as concrete values.
//!
//! Division is the exception: sentinels pass through unchanged.
//! Rays are computed in `i128` so that no intermediate result overflows.

use crate::domain::{Interval, Value};
use crate::expression::ArithOp;
use std::collections::BTreeSet;

// An arithmetic progression unbounded on one side, with positive step.
#[derive(Debug, Clone, Copy)]
enum Ray {
    // `end, end - step, end - 2*step, ...`
    Below { end: i128, step: i128 },
    // `start, start + step, start + 2*step, ...`
    Above { start: i128, step: i128 },
}

impl Ray {
    fn of(value: Value, source: Interval) -> Option<Self> {
        match value {
            Value::Ls => Some(Ray::Below {
                end: i128::from(source.min()) - 1,
                step: 1,
            }),
            Value::Gt => Some(Ray::Above {
                start: i128::from(source.max()) + 1,
                step: 1,
            }),
            Value::Int(_) => None,
        }
    }

    fn shift(self, delta: i128) -> Self {
        match self {
            Ray::Below { end, step } => Ray::Below {
                end: end + delta,
                step,
            },
            Ray::Above { start, step } => Ray::Above {
                start: start + delta,
                step,
            },
        }
    }

    // Scaling by a negative factor turns the ray around.
    fn scale(self, factor: i128) -> Self {
        let step = factor.abs();
        match self {
            Ray::Below { end, step: s } if factor > 0 => Ray::Below {
                end: end * factor,
                step: s * step,
            },
            Ray::Below { end, step: s } => Ray::Above {
                start: end * factor,
                step: s * step,
            },
            Ray::Above { start, step: s } if factor > 0 => Ray::Above {
                start: start * factor,
                step: s * step,
            },
            Ray::Above { start, step: s } => Ray::Below {
                end: start * factor,
                step: s * step,
            },
        }
    }

    fn saturate(self, target: Interval) -> BTreeSet<Value> {
        let min = i128::from(target.min());
        let max = i128::from(target.max());
        let mut values = BTreeSet::new();
        match self {
            Ray::Below { end, step } => {
                values.insert(Value::Ls);
                let mut value = end;
                if end > max {
                    values.insert(Value::Gt);
                    value = end - div_ceil(end - max, step) * step;
                }
                while value >= min {
                    values.insert(Value::Int(value as i64));
                    value -= step;
                }
            }
            Ray::Above { start, step } => {
                values.insert(Value::Gt);
                let mut value = start;
                if start < min {
                    values.insert(Value::Ls);
                    value = start + div_ceil(min - start, step) * step;
                }
                while value <= max {
                    values.insert(Value::Int(value as i64));
                    value += step;
                }
            }
        }
        values
    }
}

#[inline(always)]
fn div_ceil(lhs: i128, rhs: i128) -> i128 {
    (lhs + rhs - 1) / rhs
}

/// Computes the possible results of `value OP operand`,
/// where `value` belongs to the domain `source` and the result is stored in a
/// variable with domain `target`.
///
/// No concrete value outside of `target` is ever returned.
///
/// ```
/// # use fsmv_core::{apply, ArithOp, Interval, Value};
/// let domain = Interval::new(0, 3);
/// // the ray `(-∞, -1]` shifted by 2 reaches 0 and 1
/// let values = apply(ArithOp::Add, Value::Ls, 2, domain, domain);
/// assert_eq!(
///     values.into_iter().collect::<Vec<_>>(),
///     vec![Value::Ls, Value::Int(0), Value::Int(1)]
/// );
/// ```
pub fn apply(
    op: ArithOp,
    value: Value,
    operand: i64,
    source: Interval,
    target: Interval,
) -> BTreeSet<Value> {
    match (value, Ray::of(value, source)) {
        (Value::Int(value), _) => {
            // `None` is only possible when dividing by zero, rejected at parsing.
            let result = op.eval(value, operand).map_or(Value::Int(value), |result| {
                target.classify(result)
            });
            BTreeSet::from([result])
        }
        (_, Some(ray)) => match op {
            ArithOp::Add => ray.shift(i128::from(operand)).saturate(target),
            ArithOp::Sub => ray.shift(-i128::from(operand)).saturate(target),
            ArithOp::Mul if operand == 0 => BTreeSet::from([target.classify(0)]),
            ArithOp::Mul => ray.scale(i128::from(operand)).saturate(target),
            ArithOp::Div => BTreeSet::from([value]),
        },
        (sentinel, None) => BTreeSet::from([sentinel]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(set: BTreeSet<Value>) -> Vec<String> {
        set.into_iter().map(|v| v.to_string()).collect()
    }

    const D: Interval = Interval::new(0, 3);

    #[test]
    fn addition() {
        assert_eq!(values(apply(ArithOp::Add, Value::Ls, 2, D, D)), ["ls", "0", "1"]);
        assert_eq!(values(apply(ArithOp::Add, Value::Gt, 2, D, D)), ["gt"]);
        assert_eq!(values(apply(ArithOp::Add, Value::Int(3), 1, D, D)), ["gt"]);
        assert_eq!(values(apply(ArithOp::Add, Value::Int(1), 1, D, D)), ["2"]);
        assert_eq!(
            values(apply(ArithOp::Add, Value::Ls, 10, D, D)),
            ["ls", "0", "1", "2", "3", "gt"]
        );
    }

    #[test]
    fn subtraction() {
        assert_eq!(values(apply(ArithOp::Sub, Value::Gt, 2, D, D)), ["2", "3", "gt"]);
        assert_eq!(values(apply(ArithOp::Sub, Value::Ls, 2, D, D)), ["ls"]);
        assert_eq!(values(apply(ArithOp::Sub, Value::Int(0), 1, D, D)), ["ls"]);
        // subtracting a negative constant adds
        assert_eq!(values(apply(ArithOp::Sub, Value::Ls, -1, D, D)), ["ls", "0"]);
    }

    #[test]
    fn multiplication() {
        assert_eq!(values(apply(ArithOp::Mul, Value::Gt, 2, D, D)), ["gt"]);
        assert_eq!(values(apply(ArithOp::Mul, Value::Ls, 2, D, D)), ["ls"]);
        // `(-∞, -1] * -1` is `[1, +∞)`
        assert_eq!(
            values(apply(ArithOp::Mul, Value::Ls, -1, D, D)),
            ["1", "2", "3", "gt"]
        );
        // only multiples of the factor are reachable
        let wide = Interval::new(-10, 10);
        assert_eq!(
            values(apply(ArithOp::Mul, Value::Ls, -3, D, wide)),
            ["3", "6", "9", "gt"]
        );
        assert_eq!(values(apply(ArithOp::Mul, Value::Gt, 0, D, D)), ["0"]);
        assert_eq!(values(apply(ArithOp::Mul, Value::Int(2), 2, D, D)), ["gt"]);
    }

    #[test]
    fn division() {
        assert_eq!(values(apply(ArithOp::Div, Value::Ls, 2, D, D)), ["ls"]);
        assert_eq!(values(apply(ArithOp::Div, Value::Gt, -2, D, D)), ["gt"]);
        let wide = Interval::new(-3, 3);
        assert_eq!(values(apply(ArithOp::Div, Value::Int(3), 2, D, wide)), ["1"]);
        assert_eq!(values(apply(ArithOp::Div, Value::Int(-3), 2, wide, wide)), ["-1"]);
    }

    #[test]
    fn distinct_source_and_target() {
        let source = Interval::new(0, 1);
        let target = Interval::new(-5, 5);
        // `[2, +∞) - 4` is `[-2, +∞)`
        assert_eq!(
            values(apply(ArithOp::Sub, Value::Gt, 4, source, target)),
            ["-2", "-1", "0", "1", "2", "3", "4", "5", "gt"]
        );
    }

    #[test]
    fn closure_and_soundness() {
        let domains = [Interval::new(0, 3), Interval::new(-4, 2), Interval::point(7)];
        for source in domains {
            for target in domains {
                for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul] {
                    for operand in -4..=4 {
                        for value in source.values() {
                            let result = apply(op, value, operand, source, target);
                            assert!(!result.is_empty());
                            // no concrete value escapes the target domain
                            assert!(result.iter().all(|v| match v {
                                Value::Int(v) => target.contains(*v),
                                _ => true,
                            }));
                            // every sampled member of the ray is accounted for
                            let members: Vec<i64> = match value {
                                Value::Ls => (1..20).map(|k| source.min() - k).collect(),
                                Value::Gt => (1..20).map(|k| source.max() + k).collect(),
                                Value::Int(v) => vec![v],
                            };
                            for member in members {
                                let image = op.eval(member, operand).map(|r| target.classify(r));
                                assert!(
                                    image.is_some_and(|image| result.contains(&image)),
                                    "{member} {op} {operand} missing from {result:?}"
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}
