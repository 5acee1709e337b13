use fsmv_core::{
    Domains, Entity, Prepared, Semantics, StructuralError, System, TranslationError,
    UnsupportedExpression, prepare,
};
use fsmv_red::{RedBuilder, RedError, RedOptions};
use fsmv_smv::{Formula, SmvBuilder, SmvError};
use log::{info, warn};
use std::time::Instant;
use thiserror::Error;

/// The language to translate into.
#[derive(Debug, Clone)]
pub enum Target {
    /// NuSMV, with an optional property.
    Smv(Option<Formula>),
    /// RED.
    Red(RedOptions),
}

impl Target {
    fn semantics(&self) -> Semantics {
        match self {
            Target::Smv(_) => Semantics::SynchronousReactive,
            Target::Red(_) => Semantics::DiscreteEvent,
        }
    }

    /// A short name of the target.
    pub fn name(&self) -> &'static str {
        match self {
            Target::Smv(_) => "smv",
            Target::Red(_) => "red",
        }
    }
}

/// Errors aborting [`translate`].
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// The system could not be prepared.
    #[error(transparent)]
    Translation(#[from] TranslationError),
    /// Emitting NuSMV failed.
    #[error(transparent)]
    Smv(#[from] SmvError),
    /// Emitting RED failed.
    #[error(transparent)]
    Red(#[from] RedError),
}

impl From<StructuralError> for DriverError {
    fn from(error: StructuralError) -> Self {
        DriverError::Translation(TranslationError::Structural(error))
    }
}

/// How many entities of each kind were translated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Finite-state machines.
    pub automata: usize,
    /// Clock actors.
    pub clocks: usize,
    /// Delay actors.
    pub delays: usize,
    /// Entities the target cannot represent.
    pub skipped: usize,
}

/// The outcome of a successful translation.
#[derive(Debug, Clone)]
pub struct Translation {
    /// The program text.
    pub text: String,
    /// The inferred domains, by automaton.
    pub domains: Vec<(String, Domains)>,
    /// The expressions that were left out.
    pub diagnostics: Vec<UnsupportedExpression>,
    /// Entity counts.
    pub stats: Stats,
}

/// Checks the declared semantics of `system` against the one `target` needs.
pub fn check_semantics(system: &System, target: &Target) -> Result<(), StructuralError> {
    match system.semantics {
        Some(found) if found != target.semantics() => Err(StructuralError::IncompatibleSemantics {
            system: system.name.clone(),
            expected: target.semantics(),
            found,
        }),
        _ => Ok(()),
    }
}

/// Flattens every automaton of `system` and infers its domains.
pub fn prepare_all(
    system: &System,
    span: u32,
    progress: &mut impl FnMut(&str),
) -> Result<Vec<Prepared>, TranslationError> {
    system
        .automata()
        .map(|automaton| {
            progress(automaton.name());
            prepare(automaton, span)
        })
        .collect()
}

/// Translates `system` into `target`, calling `progress` with the name of each entity
/// as it is processed.
///
/// Nothing is returned unless the whole system is translated.
pub fn translate(
    system: &System,
    target: &Target,
    span: u32,
    mut progress: impl FnMut(&str),
) -> Result<Translation, DriverError> {
    let time = Instant::now();
    check_semantics(system, target)?;
    let prepared = prepare_all(system, span, &mut progress)?;
    let mut stats = Stats {
        automata: prepared.len(),
        ..Stats::default()
    };

    let text = match target {
        Target::Smv(formula) => {
            let mut smv = SmvBuilder::new();
            for prepared in &prepared {
                smv.add_automaton(&prepared.automaton, &prepared.domains)?;
            }
            for entity in &system.entities {
                if !matches!(entity, Entity::Fsm(_)) {
                    progress(entity.name());
                    warn!(
                        "timed entity `{}` cannot be represented in NuSMV, its outputs are left free",
                        entity.name()
                    );
                    stats.skipped += 1;
                }
            }
            smv.build(formula.as_ref())?
        }
        Target::Red(options) => {
            let mut red = RedBuilder::new(options.clone());
            let mut automata = prepared.iter();
            for entity in &system.entities {
                match entity {
                    Entity::Fsm(_) => {
                        // automata were prepared in declaration order
                        if let Some(prepared) = automata.next() {
                            red.add_automaton(&prepared.automaton, &prepared.domains)?;
                        }
                    }
                    Entity::Clock(clock) => {
                        progress(&clock.name);
                        red.add_clock(clock)?;
                        stats.clocks += 1;
                    }
                    Entity::Delay(delay) => {
                        progress(&delay.name);
                        red.add_delay(delay)?;
                        stats.delays += 1;
                    }
                }
            }
            red.build()?
        }
    };
    info!(target: "translate", "translated `{}` to {} in {:?}", system.name, target.name(), time.elapsed());

    let mut domains = Vec::with_capacity(prepared.len());
    let mut diagnostics = Vec::new();
    for prepared in prepared {
        domains.push((prepared.automaton.name().to_owned(), prepared.domains));
        diagnostics.extend(prepared.diagnostics);
    }
    Ok(Translation {
        text,
        domains,
        diagnostics,
        stats,
    })
}
