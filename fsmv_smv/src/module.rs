use fsmv_core::{
    Automaton, CaseArm, Choice, Comparison, Domains, Interval, TransitionEncoding, Update,
    Value, admissible, apply, encode, generate,
};
use log::trace;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Write};

/// A rendered `MODULE` with what the main module needs to instantiate it.
#[derive(Debug, Clone)]
pub(crate) struct Module {
    pub(crate) name: String,
    pub(crate) params: Vec<String>,
    pub(crate) outputs: BTreeSet<String>,
    pub(crate) text: String,
}

// Case arms with the same precondition are merged into a non-deterministic choice.
struct Case<T: Ord + Display> {
    arms: BTreeMap<String, BTreeSet<T>>,
}

impl<T: Ord + Display> Case<T> {
    fn new() -> Self {
        Self {
            arms: BTreeMap::new(),
        }
    }

    fn extend(&mut self, arms: impl IntoIterator<Item = CaseArm<BTreeSet<T>>>) {
        for arm in arms {
            self.arms.entry(arm.precondition).or_default().extend(arm.next);
        }
    }

    fn write(&self, text: &mut String, var: &str, default: &str) -> fmt::Result {
        writeln!(text, "\t\tnext({var}) :=")?;
        writeln!(text, "\t\t\tcase")?;
        for (precondition, values) in &self.arms {
            let values: Vec<String> = values.iter().map(ToString::to_string).collect();
            writeln!(text, "\t\t\t\t{precondition} : {{ {} }};", values.join(", "))?;
        }
        writeln!(text, "\t\t\t\t1 : {default};")?;
        writeln!(text, "\t\t\tesac;")
    }
}

// The state and signals a transition needs, and the admissible values of the variables it compares.
fn guard_choices<'a>(
    automaton: &Automaton,
    encoding: &'a TransitionEncoding,
    domains: &Domains,
) -> Option<(String, Vec<Choice>)> {
    let mut base = format!("state={}", automaton.state_name(encoding.source));
    for input in &encoding.inputs {
        base.push_str(&format!(" & {input}=1"));
    }
    let mut compared: BTreeMap<&str, Vec<&'a Comparison>> = BTreeMap::new();
    for comparison in &encoding.preconditions {
        compared
            .entry(comparison.var.as_str())
            .or_default()
            .push(comparison);
    }
    let mut choices = Vec::with_capacity(compared.len());
    for (var, comparisons) in compared {
        let Some(interval) = domains.get(var) else {
            // only possible for transitions out of unreachable states
            trace!("`{var}` has no domain, skipping transition `{}`", encoding.name);
            return None;
        };
        choices.push(Choice {
            var: var.to_owned(),
            values: admissible(interval, comparisons),
        });
    }
    Some((base, choices))
}

fn values_of(interval: Interval) -> String {
    interval
        .values()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn render(automaton: &Automaton, domains: &Domains) -> Result<Module, fmt::Error> {
    let name = automaton.name().to_owned();
    let outputs: BTreeSet<String> = automaton
        .output_signals()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let params: Vec<String> = automaton
        .input_signals()
        .into_iter()
        .filter(|signal| !outputs.contains(*signal))
        .map(str::to_owned)
        .collect();
    let encodings: Vec<TransitionEncoding> = automaton.transitions().iter().map(encode).collect();

    let mut text = String::new();
    writeln!(text, "MODULE {name}({})", params.join(", "))?;
    writeln!(text, "\tVAR")?;
    let states: Vec<&str> = automaton.states().iter().map(|s| s.name()).collect();
    writeln!(text, "\t\tstate : {{{}}};", states.join(","))?;
    for (var, interval) in domains.variables() {
        writeln!(text, "\t\t{var} : {{{}}};", values_of(interval))?;
    }
    for signal in &outputs {
        writeln!(text, "\t\t{signal} : {{0,1}};")?;
    }

    writeln!(text, "\tASSIGN")?;
    writeln!(
        text,
        "\t\tinit(state) := {};",
        automaton.state_name(automaton.initial())
    )?;
    let mut case = Case::new();
    for encoding in &encodings {
        if let Some((base, choices)) = guard_choices(automaton, encoding, domains) {
            let target = automaton.state_name(encoding.target);
            case.extend(generate(&base, &choices, |_| Some(BTreeSet::from([target]))));
        }
    }
    case.write(&mut text, "state", "state")?;

    for (var, interval) in domains.variables() {
        let init = automaton
            .variables()
            .get(var)
            .map_or(Value::Int(interval.min()), |init| interval.classify(*init));
        writeln!(text, "\t\tinit({var}) := {init};")?;
        let mut case = Case::new();
        for encoding in &encodings {
            // the last assignment to `var` wins
            let Some(update) = encoding
                .updates
                .iter()
                .rev()
                .find(|assignment| assignment.var == var)
                .map(|assignment| &assignment.update)
            else {
                continue;
            };
            let Some((base, mut choices)) = guard_choices(automaton, encoding, domains) else {
                continue;
            };
            match update {
                Update::Constant(value) => {
                    let next = BTreeSet::from([interval.classify(*value)]);
                    case.extend(generate(&base, &choices, |_| Some(next.clone())));
                }
                Update::Offset {
                    source,
                    op,
                    operand,
                } => {
                    // reported as unsupported when preparing the automaton
                    let Some(source_domain) = domains.get(source) else {
                        trace!("`{source}` has no domain, skipping update of `{var}` in `{}`", encoding.name);
                        continue;
                    };
                    if choices.iter().all(|choice| choice.var != *source) {
                        choices.push(Choice {
                            var: source.clone(),
                            values: source_domain.values().collect(),
                        });
                    }
                    case.extend(generate(&base, &choices, |valuation| {
                        let value = valuation.get(source)?;
                        Some(apply(*op, value, *operand, source_domain, interval))
                    }));
                }
            }
        }
        case.write(&mut text, var, var)?;
    }

    for signal in &outputs {
        writeln!(text, "\t\tinit({signal}) := 0;")?;
        let mut case = Case::new();
        for encoding in encodings.iter().filter(|e| e.outputs.contains(signal)) {
            if let Some((base, choices)) = guard_choices(automaton, encoding, domains) {
                case.extend(generate(&base, &choices, |_| {
                    Some(BTreeSet::from([Value::Int(1)]))
                }));
            }
        }
        case.write(&mut text, signal, "0")?;
    }

    Ok(Module {
        name,
        params,
        outputs,
        text,
    })
}
