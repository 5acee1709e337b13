//! Translation of flat automata into the input language of the NuSMV symbolic model checker.
//!
//! Each automaton becomes a `MODULE` whose parameters are the signals it consumes
//! from other modules.
//! Its state, its variables (enumerated over their inferred domains, with `ls` and `gt` sentinels)
//! and the signals it emits are all assigned through `case` expressions,
//! one arm per combination of admissible values of the variables a transition reads.
//! A `main` module instantiates every automaton and wires signals between them.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod module;

use fsmv_core::{Automaton, Domains};
use log::{debug, info};
use module::Module;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};
use std::time::Instant;
use thiserror::Error;

/// The temporal logic a property is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logic {
    /// Computation tree logic, checked as `SPEC`.
    Ctl,
    /// Linear temporal logic, checked as `LTLSPEC`.
    Ltl,
}

impl Logic {
    fn keyword(self) -> &'static str {
        match self {
            Logic::Ctl => "SPEC",
            Logic::Ltl => "LTLSPEC",
        }
    }
}

/// A temporal property, written in the syntax of the model checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    /// The logic of the formula.
    pub logic: Logic,
    /// The formula's text, copied verbatim.
    pub text: String,
}

/// Errors while emitting NuSMV text.
#[derive(Debug, Clone, Error)]
pub enum SmvError {
    /// Two automata have the same name.
    #[error("module `{0}` already defined")]
    DuplicateModule(String),
    /// Writing the text failed.
    #[error("failed to format module")]
    Fmt(#[from] fmt::Error),
}

/// Collects the modules of a NuSMV program.
///
/// ```
/// # use fsmv_core::{prepare, AutomatonBuilder, Label};
/// # use fsmv_smv::SmvBuilder;
/// let mut builder = AutomatonBuilder::new("M");
/// let a = builder.new_initial_state("A").unwrap();
/// let b = builder.new_state("B").unwrap();
/// builder.add_transition("t", a, b, Label::new().guard("x == 1")).unwrap();
/// let prepared = prepare(&builder.build().unwrap(), 0).unwrap();
///
/// let mut smv = SmvBuilder::new();
/// smv.add_automaton(&prepared.automaton, &prepared.domains).unwrap();
/// let text = smv.build(None).unwrap();
/// assert!(text.contains("state=A & x=1 : { B };"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SmvBuilder {
    modules: Vec<Module>,
}

impl SmvBuilder {
    /// Creates a new [`SmvBuilder`] with no modules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders a flat automaton as a `MODULE`.
    pub fn add_automaton(&mut self, automaton: &Automaton, domains: &Domains) -> Result<(), SmvError> {
        if self.modules.iter().any(|m| m.name == automaton.name()) {
            return Err(SmvError::DuplicateModule(automaton.name().to_owned()));
        }
        let time = Instant::now();
        let module = module::render(automaton, domains)?;
        debug!(
            "module `{}`: parameters {:?}, outputs {:?}",
            module.name, module.params, module.outputs
        );
        info!(target: "smv", "rendered module `{}` in {:?}", module.name, time.elapsed());
        self.modules.push(module);
        Ok(())
    }

    /// Produces the program: the `main` module followed by every automaton's module.
    ///
    /// Signals consumed but emitted by no automaton are left free in `main`,
    /// and signals emitted by more than one automaton are merged by a `DEFINE`.
    pub fn build(self, formula: Option<&Formula>) -> Result<String, SmvError> {
        let mut emitters: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for module in &self.modules {
            for output in &module.outputs {
                emitters.entry(output).or_default().push(&module.name);
            }
        }
        let consumed: BTreeSet<&str> = self
            .modules
            .iter()
            .flat_map(|module| module.params.iter().map(String::as_str))
            .collect();
        let free: Vec<&str> = consumed
            .iter()
            .copied()
            .filter(|signal| !emitters.contains_key(signal))
            .collect();
        let merged: Vec<(&str, &[&str])> = consumed
            .iter()
            .filter_map(|signal| {
                emitters
                    .get(signal)
                    .filter(|emitters| emitters.len() > 1)
                    .map(|emitters| (*signal, emitters.as_slice()))
            })
            .collect();

        let mut text = String::new();
        writeln!(text, "MODULE main")?;
        writeln!(text, "\tVAR")?;
        for signal in &free {
            writeln!(text, "\t\t{signal} : {{0,1}};")?;
        }
        for module in &self.modules {
            let args: Vec<String> = module
                .params
                .iter()
                .map(|param| match emitters.get(param.as_str()).map(Vec::as_slice) {
                    Some([emitter]) => format!("{emitter}.{param}"),
                    _ => param.clone(),
                })
                .collect();
            writeln!(text, "\t\t{0} : {0}({1});", module.name, args.join(", "))?;
        }
        if !merged.is_empty() {
            writeln!(text, "\tDEFINE")?;
            for (signal, emitters) in merged {
                let present: Vec<String> = emitters
                    .iter()
                    .map(|emitter| format!("{emitter}.{signal}=1"))
                    .collect();
                writeln!(
                    text,
                    "\t\t{signal} := case {} : 1; 1 : 0; esac;",
                    present.join(" | ")
                )?;
            }
        }
        if let Some(formula) = formula {
            writeln!(text, "\t{}", formula.logic.keyword())?;
            writeln!(text, "\t\t{}", formula.text)?;
        }
        for module in &self.modules {
            writeln!(text)?;
            text.push_str(&module.text);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsmv_core::{AutomatonBuilder, Label, TranslationError, Unsupported, prepare};

    fn add(smv: &mut SmvBuilder, builder: AutomatonBuilder) -> Result<(), TranslationError> {
        let prepared = prepare(&builder.build()?, 0)?;
        smv.add_automaton(&prepared.automaton, &prepared.domains)
            .expect("add automaton");
        Ok(())
    }

    #[test]
    fn two_states() -> Result<(), TranslationError> {
        let mut builder = AutomatonBuilder::new("M");
        let a = builder.new_initial_state("A")?;
        let b = builder.new_state("B")?;
        builder.add_transition("t", a, b, Label::new().guard("x==1"))?;
        let mut smv = SmvBuilder::new();
        add(&mut smv, builder)?;
        let text = smv.build(None).expect("build");
        assert!(text.contains("MODULE M()"));
        assert!(text.contains("state : {A,B};"));
        assert!(text.contains("x : {ls,1,gt};"));
        assert!(text.contains("state=A & x=1 : { B };"));
        assert!(text.contains("1 : state;"));
        assert!(text.contains("init(x) := 1;"));
        assert!(text.contains("M : M();"));
        assert!(!text.contains("SPEC"));
        Ok(())
    }

    #[test]
    fn counter_saturates() -> Result<(), TranslationError> {
        let mut builder = AutomatonBuilder::new("Counter");
        let s = builder.new_initial_state("S")?;
        builder.new_var("x", 0)?;
        builder.add_transition(
            "inc",
            s,
            s,
            Label::new().guard("x < 2").set("x = x + 1").output("tick = 1"),
        )?;
        let mut smv = SmvBuilder::new();
        add(&mut smv, builder)?;
        let text = smv.build(None).expect("build");
        assert!(text.contains("x : {ls,0,1,2,gt};"));
        assert!(text.contains("init(x) := 0;"));
        assert!(text.contains("state=S & x=ls : { ls, 0 };"));
        assert!(text.contains("state=S & x=1 : { 2 };"));
        assert!(!text.contains("state=S & x=2 :"));
        assert!(text.contains("tick : {0,1};"));
        assert!(text.contains("init(tick) := 0;"));
        assert!(text.contains("1 : 0;"));
        Ok(())
    }

    #[test]
    fn main_module_wiring() -> Result<(), TranslationError> {
        let mut producer = AutomatonBuilder::new("Producer");
        let p = producer.new_initial_state("P")?;
        producer.add_transition("emit", p, p, Label::new().guard("start_isPresent").output("req = 1"))?;
        let mut other = AutomatonBuilder::new("Other");
        let o = other.new_initial_state("O")?;
        other.add_transition("emit", o, o, Label::new().output("ack = 1"))?;
        let mut twin = AutomatonBuilder::new("Twin");
        let t = twin.new_initial_state("T")?;
        twin.add_transition("emit", t, t, Label::new().output("ack = 1"))?;
        let mut consumer = AutomatonBuilder::new("Consumer");
        let c = consumer.new_initial_state("C")?;
        let d = consumer.new_state("D")?;
        consumer.add_transition("go", c, d, Label::new().guard("req_isPresent && ack_isPresent"))?;

        let mut smv = SmvBuilder::new();
        for builder in [producer, other, twin, consumer] {
            add(&mut smv, builder)?;
        }
        let formula = Formula {
            logic: Logic::Ltl,
            text: "G F Consumer.state = D".to_owned(),
        };
        let text = smv.build(Some(&formula)).expect("build");
        assert!(text.starts_with("MODULE main\n"));
        assert!(text.contains("\t\tstart : {0,1};"));
        assert!(text.contains("Producer : Producer(start);"));
        assert!(text.contains("Consumer : Consumer(ack, Producer.req);"));
        assert!(text.contains("ack := case Other.ack=1 | Twin.ack=1 : 1; 1 : 0; esac;"));
        assert!(text.contains("\tLTLSPEC\n\t\tG F Consumer.state = D\n"));
        assert!(text.contains("MODULE Consumer(ack, req)"));
        assert!(text.contains("state=C & ack=1 & req=1 : { D };"));
        Ok(())
    }

    #[test]
    fn local_signals() -> Result<(), TranslationError> {
        let mut builder = AutomatonBuilder::new("Loop");
        let a = builder.new_initial_state("A")?;
        let b = builder.new_state("B")?;
        builder.add_transition("ping", a, b, Label::new().output("pong = 1"))?;
        builder.add_transition("pong", b, a, Label::new().guard("pong_isPresent"))?;
        let mut smv = SmvBuilder::new();
        add(&mut smv, builder)?;
        let text = smv.build(None).expect("build");
        assert!(text.contains("MODULE Loop()"));
        assert!(text.contains("state=B & pong=1 : { A };"));
        assert!(text.contains("state=A : { 1 };"));
        Ok(())
    }

    #[test]
    fn offset_from_unknown_variable() -> Result<(), TranslationError> {
        let mut builder = AutomatonBuilder::new("M");
        let a = builder.new_initial_state("A")?;
        builder.add_transition("copy", a, a, Label::new().guard("go_isPresent").set("y = w + 1"))?;
        let prepared = prepare(&builder.build()?, 0)?;
        assert_eq!(prepared.diagnostics.len(), 1);
        assert_eq!(prepared.diagnostics[0].expression, "y = w + 1");
        assert_eq!(prepared.diagnostics[0].reason, Unsupported::UndeclaredSource);

        let mut smv = SmvBuilder::new();
        smv.add_automaton(&prepared.automaton, &prepared.domains)
            .expect("add automaton");
        let text = smv.build(None).expect("build");
        assert!(text.contains("y : {ls,1,gt};"));
        assert!(!text.contains("w="));
        // `y` keeps its value
        assert!(text.contains("\t\tnext(y) :=\n\t\t\tcase\n\t\t\t\t1 : y;\n\t\t\tesac;"));
        Ok(())
    }

    #[test]
    fn duplicate_module() -> Result<(), TranslationError> {
        let mut builder = AutomatonBuilder::new("M");
        builder.new_initial_state("A")?;
        let automaton = builder.build()?;
        let prepared = prepare(&automaton, 0)?;
        let mut smv = SmvBuilder::new();
        smv.add_automaton(&prepared.automaton, &prepared.domains)
            .expect("first");
        assert!(matches!(
            smv.add_automaton(&prepared.automaton, &prepared.domains),
            Err(SmvError::DuplicateModule(name)) if name == "M"
        ));
        Ok(())
    }
}
