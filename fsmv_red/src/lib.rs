//! Translation of flat automata and timed actors into communicating timed automata,
//! in the input language of the RED symbolic TCTL model checker.
//!
//! Every entity becomes a process with its own modes (locations).
//! Processes communicate through synchronizers:
//! `!s` on one side of a transition fires together with `?s` on another.
//! Since a synchronization is instantaneous, an automaton cannot miss a signal
//! it is not ready for: every input signal of an automaton is buffered by a *port* process,
//! from which the automaton consumes it through the synchronizer `ND_<automaton>_<signal>`.
//!
//! All processes share a local clock `t`, that automata reset on every transition.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod delay;
mod fsm;
mod port;

use fsmv_core::{Automaton, ClockActor, DelayActor, Domains, StructuralError};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};
use std::time::Instant;
use thiserror::Error;

/// Largest supported buffer size of a delay actor,
/// whose number of modes is exponential in it.
pub const MAX_BUFFER_SIZE: u32 = 16;

/// How input signals are buffered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PortDiscipline {
    /// At most one token, consumed in the same instant it arrives.
    #[default]
    Token,
    /// A bounded counter of pending tokens.
    Counted,
}

/// What the specification section contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Specification {
    /// A formula, copied verbatim.
    Formula(String),
    /// The risk of reaching `Buffer_Overflow` in any process.
    BufferOverflow,
    /// Nothing.
    #[default]
    None,
}

/// Parameters of the translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedOptions {
    /// How input signals are buffered.
    pub ports: PortDiscipline,
    /// The capacity of counted ports.
    pub buffer_size: u32,
    /// The specification section.
    pub specification: Specification,
}

impl Default for RedOptions {
    fn default() -> Self {
        Self {
            ports: PortDiscipline::default(),
            buffer_size: 1,
            specification: Specification::default(),
        }
    }
}

/// Errors while emitting RED text.
#[derive(Debug, Clone, Error)]
pub enum RedError {
    /// Two processes have the same name.
    #[error("process `{0}` already defined")]
    DuplicateProcess(String),
    /// The buffer size is zero or too large.
    #[error("buffer size of `{entity}` is {size}, it must be between 1 and {}", MAX_BUFFER_SIZE)]
    BufferSize {
        /// The entity with the buffer.
        entity: String,
        /// The offending size.
        size: u32,
    },
    /// The model is malformed.
    #[error(transparent)]
    Structural(#[from] StructuralError),
    /// Writing the text failed.
    #[error("failed to format process")]
    Fmt(#[from] fmt::Error),
}

/// Turns a name into an identifier RED accepts.
pub fn ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

// Distinct names must stay distinct once turned into identifiers.
pub(crate) fn check_idents<'n>(
    scope: &str,
    names: impl IntoIterator<Item = &'n str>,
) -> Result<(), StructuralError> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for name in names {
        let id = ident(name);
        match seen.get(id.as_str()) {
            Some(first) if *first != name => {
                return Err(StructuralError::IdentifierClash {
                    scope: scope.to_owned(),
                    first: (*first).to_owned(),
                    second: name.to_owned(),
                    ident: id,
                });
            }
            Some(_) => {}
            None => {
                seen.insert(id, name);
            }
        }
    }
    Ok(())
}

// A process: its name as listed in the header, and its initial mode.
#[derive(Debug, Clone)]
pub(crate) struct Process {
    pub(crate) name: String,
    pub(crate) initial: String,
}

// The sections of the program, filled in by each entity.
#[derive(Debug, Default)]
pub(crate) struct Program {
    pub(crate) processes: Vec<Process>,
    pub(crate) ports: Vec<Process>,
    pub(crate) defines: Vec<String>,
    pub(crate) discretes: Vec<String>,
    pub(crate) clocks: Vec<String>,
    pub(crate) synchronizers: BTreeSet<String>,
    pub(crate) initial_values: Vec<String>,
    pub(crate) modes: String,
}

impl Program {
    // `!signal` if anyone receives it.
    pub(crate) fn emit(&mut self, signal: &str, received: &BTreeSet<String>) -> Option<String> {
        received.contains(signal).then(|| {
            let signal = ident(signal);
            self.synchronizers.insert(signal.clone());
            format!("!{signal}")
        })
    }

    pub(crate) fn receive(&mut self, signal: &str) -> String {
        let signal = ident(signal);
        self.synchronizers.insert(signal.clone());
        format!("?{signal}")
    }
}

enum Entity<'a> {
    Fsm(&'a Automaton, &'a Domains),
    Clock(&'a ClockActor),
    Delay(&'a DelayActor),
}

/// Collects the entities of a RED program.
///
/// ```
/// # use fsmv_core::{DelayActor, DelayKind};
/// # use fsmv_red::{RedBuilder, RedOptions};
/// let delay = DelayActor {
///     name: "D".to_string(),
///     kind: DelayKind::Timed,
///     delay: 3.0,
///     buffer_size: 2,
///     input: "a".to_string(),
///     output: "b".to_string(),
/// };
/// let mut red = RedBuilder::new(RedOptions::default());
/// red.add_delay(&delay).unwrap();
/// let text = red.build().unwrap();
/// assert!(text.contains("mode D_S11 (D_C0 <= D_DELAY && D_C1 <= D_DELAY) {"));
/// ```
pub struct RedBuilder<'a> {
    options: RedOptions,
    names: BTreeSet<String>,
    entities: Vec<Entity<'a>>,
}

impl<'a> RedBuilder<'a> {
    /// Creates a new [`RedBuilder`] with no entities.
    pub fn new(options: RedOptions) -> Self {
        Self {
            options,
            names: BTreeSet::new(),
            entities: Vec::new(),
        }
    }

    fn register(&mut self, name: &str) -> Result<(), RedError> {
        if self.names.insert(ident(name)) {
            Ok(())
        } else {
            Err(RedError::DuplicateProcess(name.to_owned()))
        }
    }

    /// Adds a flat automaton with the domains of its variables.
    pub fn add_automaton(&mut self, automaton: &'a Automaton, domains: &'a Domains) -> Result<(), RedError> {
        self.register(automaton.name())?;
        if self.options.ports == PortDiscipline::Counted {
            check_buffer(automaton.name(), self.options.buffer_size)?;
        }
        self.entities.push(Entity::Fsm(automaton, domains));
        Ok(())
    }

    /// Adds a clock actor.
    pub fn add_clock(&mut self, clock: &'a ClockActor) -> Result<(), RedError> {
        check_signal(&clock.name, "output", &clock.output)?;
        self.register(&clock.name)?;
        self.entities.push(Entity::Clock(clock));
        Ok(())
    }

    /// Adds a delay actor.
    pub fn add_delay(&mut self, delay: &'a DelayActor) -> Result<(), RedError> {
        check_signal(&delay.name, "input", &delay.input)?;
        check_signal(&delay.name, "output", &delay.output)?;
        check_buffer(&delay.name, delay.buffer_size)?;
        self.register(&delay.name)?;
        self.entities.push(Entity::Delay(delay));
        Ok(())
    }

    /// Produces the program.
    pub fn build(self) -> Result<String, RedError> {
        let time = Instant::now();
        let received: BTreeSet<String> = self
            .entities
            .iter()
            .flat_map(|entity| match entity {
                Entity::Fsm(automaton, _) => automaton
                    .input_signals()
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
                Entity::Delay(delay) => vec![delay.input.clone()],
                Entity::Clock(_) => Vec::new(),
            })
            .collect();
        debug!("received signals: {received:?}");
        let emitted = self.entities.iter().flat_map(|entity| match entity {
            Entity::Fsm(automaton, _) => automaton.output_signals().into_iter().collect(),
            Entity::Delay(delay) => vec![delay.output.as_str()],
            Entity::Clock(clock) => vec![clock.output.as_str()],
        });
        check_idents("signals", received.iter().map(String::as_str).chain(emitted))?;

        let mut program = Program::default();
        for entity in &self.entities {
            match entity {
                Entity::Fsm(automaton, domains) => {
                    fsm::render(automaton, domains, &self.options, &received, &mut program)?
                }
                Entity::Clock(clock) => clock::render(clock, &received, &mut program)?,
                Entity::Delay(delay) => delay::render(delay, &received, &mut program)?,
            }
        }
        let text = self.assemble(&program)?;
        info!(target: "red", "assembled {} processes in {:?}", program.processes.len() + program.ports.len(), time.elapsed());
        Ok(text)
    }

    fn assemble(&self, program: &Program) -> Result<String, fmt::Error> {
        let processes: Vec<&Process> = program.processes.iter().chain(&program.ports).collect();
        let mut text = String::new();
        writeln!(text, "/*")?;
        writeln!(text)?;
        writeln!(text, "This file represents a Communicating Timed Automata (CTA)")?;
        writeln!(text, "model, in the input format of the RED symbolic TCTL model checker.")?;
        writeln!(text)?;
        for (idx, process) in processes.iter().enumerate() {
            writeln!(text, "Process {}: {}", idx + 1, process.name)?;
        }
        writeln!(text)?;
        writeln!(text, "*/")?;
        writeln!(text)?;
        for define in &program.defines {
            writeln!(text, "#define {define}")?;
        }
        if !program.defines.is_empty() {
            writeln!(text)?;
        }
        writeln!(text, "process count = {};", processes.len())?;
        writeln!(text)?;
        for discrete in &program.discretes {
            writeln!(text, "global discrete {discrete};")?;
        }
        if !program.discretes.is_empty() {
            writeln!(text)?;
        }
        if !program.clocks.is_empty() {
            writeln!(text, "global clock {};", program.clocks.join(", "))?;
        }
        writeln!(text, "local clock t;")?;
        if !program.synchronizers.is_empty() {
            let synchronizers: Vec<&str> = program.synchronizers.iter().map(String::as_str).collect();
            writeln!(text, "global synchronizer {};", synchronizers.join(", "))?;
        }
        text.push_str(&program.modes);
        writeln!(text)?;
        writeln!(text, "/* State representing buffer overflow */")?;
        writeln!(text, "mode Buffer_Overflow (true) {{")?;
        writeln!(text, "}}")?;
        writeln!(text)?;

        let mut initially: Vec<String> = processes
            .iter()
            .enumerate()
            .map(|(idx, process)| format!("{}[{}]", process.initial, idx + 1))
            .collect();
        initially.extend(program.initial_values.iter().cloned());
        initially.extend(program.clocks.iter().map(|clock| format!("{clock} == 0")));
        initially.extend((1..=processes.len()).map(|idx| format!("t[{idx}] == 0")));
        writeln!(text, "/* Initial condition */")?;
        writeln!(text, "initially")?;
        writeln!(text, "    {};", initially.join(" &&\n    "))?;
        writeln!(text)?;

        writeln!(text, "/* Specification */")?;
        match &self.options.specification {
            Specification::Formula(formula) => writeln!(text, "{formula}")?,
            Specification::BufferOverflow => {
                writeln!(text, "risk")?;
                writeln!(text, "exists i:i>=1, (Buffer_Overflow[i]);")?;
            }
            Specification::None => writeln!(text, "/* none */")?,
        }
        Ok(text)
    }
}

fn check_signal(entity: &str, port: &'static str, signal: &str) -> Result<(), StructuralError> {
    if signal.trim().is_empty() {
        Err(StructuralError::MissingSignal {
            entity: entity.to_owned(),
            port,
        })
    } else {
        Ok(())
    }
}

fn check_buffer(entity: &str, size: u32) -> Result<(), RedError> {
    if (1..=MAX_BUFFER_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(RedError::BufferSize {
            entity: entity.to_owned(),
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsmv_core::{AutomatonBuilder, DelayKind, Label, TranslationError, prepare};

    #[test]
    fn identifiers() {
        assert_eq!(ident("Run-on"), "Run_on");
        assert_eq!(ident("a.b c"), "a_b_c");
        assert_eq!(ident("plain_42"), "plain_42");
    }

    #[test]
    fn buffer_overflow_risk() -> Result<(), TranslationError> {
        let mut builder = AutomatonBuilder::new("N");
        let s = builder.new_initial_state("S")?;
        builder.add_transition("t", s, s, Label::new().guard("P_isPresent"))?;
        let prepared = prepare(&builder.build()?, 0)?;
        let options = RedOptions {
            specification: Specification::BufferOverflow,
            ..RedOptions::default()
        };
        let mut red = RedBuilder::new(options);
        red.add_automaton(&prepared.automaton, &prepared.domains)
            .expect("add automaton");
        let text = red.build().expect("build");
        assert!(text.contains("Process 1: N\nProcess 2: N_Port_P\n"));
        assert!(text.contains("process count = 2;"));
        assert!(text.contains("local clock t;"));
        assert!(text.contains("global synchronizer ND_N_P, P;"));
        assert!(text.contains("mode Buffer_Overflow (true) {\n}"));
        assert!(text.contains(
            "initially\n    N_State_S_Birth[1] &&\n    N_Port_P_TokenEmpty[2] &&\n    t[1] == 0 &&\n    t[2] == 0;"
        ));
        assert!(text.ends_with("risk\nexists i:i>=1, (Buffer_Overflow[i]);\n"));
        Ok(())
    }

    fn delay(buffer_size: u32, input: &str) -> DelayActor {
        DelayActor {
            name: "D".to_owned(),
            kind: DelayKind::Nondeterministic,
            delay: 1.0,
            buffer_size,
            input: input.to_owned(),
            output: "b".to_owned(),
        }
    }

    #[test]
    fn invalid_actors() {
        let empty = delay(0, "a");
        let mut red = RedBuilder::new(RedOptions::default());
        assert!(matches!(
            red.add_delay(&empty),
            Err(RedError::BufferSize { size: 0, .. })
        ));

        let huge = delay(MAX_BUFFER_SIZE + 1, "a");
        let mut red = RedBuilder::new(RedOptions::default());
        assert!(matches!(
            red.add_delay(&huge),
            Err(RedError::BufferSize { .. })
        ));

        let unconnected = delay(1, " ");
        let mut red = RedBuilder::new(RedOptions::default());
        assert!(matches!(
            red.add_delay(&unconnected),
            Err(RedError::Structural(StructuralError::MissingSignal { port: "input", .. }))
        ));
    }

    #[test]
    fn clashing_state_names() -> Result<(), TranslationError> {
        let mut builder = AutomatonBuilder::new("N");
        let dash = builder.new_initial_state("A-b")?;
        let underscore = builder.new_state("A_b")?;
        builder.add_transition("t", dash, underscore, Label::new())?;
        let prepared = prepare(&builder.build()?, 0)?;
        let mut red = RedBuilder::new(RedOptions::default());
        red.add_automaton(&prepared.automaton, &prepared.domains)
            .expect("add automaton");
        assert!(matches!(
            red.build(),
            Err(RedError::Structural(StructuralError::IdentifierClash { scope, ident, .. }))
                if scope == "N" && ident == "A_b"
        ));
        Ok(())
    }

    #[test]
    fn clashing_signal_names() {
        let wire = delay(1, "a-b");
        let clock = ClockActor {
            name: "C".to_owned(),
            period: 1.0,
            stop_time: None,
            cycles: None,
            output: "a_b".to_owned(),
        };
        let mut red = RedBuilder::new(RedOptions::default());
        red.add_delay(&wire).expect("delay");
        red.add_clock(&clock).expect("clock");
        assert!(matches!(
            red.build(),
            Err(RedError::Structural(StructuralError::IdentifierClash { first, second, .. }))
                if first == "a-b" && second == "a_b"
        ));
    }

    #[test]
    fn duplicate_processes() {
        let clock = ClockActor {
            name: "C".to_owned(),
            period: 1.0,
            stop_time: None,
            cycles: None,
            output: "tick".to_owned(),
        };
        let mut red = RedBuilder::new(RedOptions::default());
        red.add_clock(&clock).expect("first clock");
        assert!(matches!(
            red.add_clock(&clock),
            Err(RedError::DuplicateProcess(name)) if name == "C"
        ));
    }
}
