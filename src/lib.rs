//! # FSMV (Finite-State Machine Verification)
//!
//! FSMV translates systems of hierarchical finite-state machines
//! into the input languages of formal verification tools,
//! so that their properties can be model checked.
//!
//! State machines have a textual guard, set-action and output-action on each transition,
//! and communicate through named signals.
//! Each machine can be refined by a single level of nested machines,
//! which FSMV flattens before translation.
//! Integer variables are enumerated over domains inferred from the literals the machine uses,
//! with two sentinel values standing for anything below or above them.
//!
//! At the moment the following targets are implemented:
//!
//! - [x] [NuSMV](https://nusmv.fbk.eu/), as symbolic transition systems,[^1]
//!   for synchronous reactive models;
//! - [x] [RED](https://sourceforge.net/projects/redlib/), as communicating timed automata,
//!   for discrete event models with clocks and delays.
//!
//! [^1]: Baier, C., & Katoen, J. (2008). *Principles of model checking*. MIT Press.

mod progress;
mod red;
mod report;
mod smv;
mod translate;

use anyhow::Context;
use clap::{Parser, Subcommand};
use flate2::{Compression, write::GzEncoder};
use fsmv_core::{Entity, System};
use log::info;
use progress::Bar;
use red::RedArgs;
use report::Report;
use smv::SmvArgs;
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};
pub use translate::{
    DriverError, Stats, Target, Translation, check_semantics, prepare_all, translate,
};

/// Where and how to write a translation.
#[derive(Debug, Clone, Parser)]
#[deny(missing_docs)]
pub(crate) struct OutputArgs {
    /// File to write the translation to, instead of the standard output.
    ///
    /// The file is compressed with gzip if its name ends with '.gz'.
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub(crate) output: Option<PathBuf>,
    /// How many times the width of each inferred domain is added on either side of it.
    #[arg(long, default_value_t = 0)]
    pub(crate) span: u32,
    /// Print a progress bar over the entities of the model.
    #[arg(long, value_enum)]
    pub(crate) progress: Option<Bar>,
    /// Print JSON-serialized final translation report.
    ///
    /// When writing to a file, FSMV prints a user-friendly report at the end of translation.
    /// This flag has the report printed in JSON format instead.
    /// Without an output file, the report is printed to the standard error.
    #[arg(long)]
    pub(crate) json: bool,
}

/// FSMV's available commands.
#[deny(missing_docs)]
#[derive(Subcommand)]
enum Commands {
    /// Validate the model, reporting the expressions that cannot be translated.
    Validate,
    /// Print the domains inferred for the variables of each state machine.
    Domains {
        /// How many times the width of each inferred domain is added on either side of it.
        #[arg(long, default_value_t = 0)]
        span: u32,
        /// Print JSON-serialized domains.
        #[arg(long)]
        json: bool,
    },
    /// Translate the model into NuSMV.
    ///
    /// EXAMPLE: fsmv PATH/TO/MODEL smv
    /// EXAMPLE: fsmv PATH/TO/MODEL smv --kind ltl --formula 'G F M.state = B' -o model.smv
    #[clap(verbatim_doc_comment)]
    Smv(SmvArgs),
    /// Translate the model into RED.
    ///
    /// EXAMPLE: fsmv PATH/TO/MODEL red --buffer-overflow
    /// EXAMPLE: fsmv PATH/TO/MODEL red --ports counted --buffer-size 4 -o model.d.gz
    #[clap(verbatim_doc_comment)]
    Red(RedArgs),
}

/// A translator of hierarchical state machines into model checker inputs.
///
/// FSMV (Finite-State Machine Verification) reads a system of hierarchical state machines,
/// clocks and delays described in JSON,
/// and translates it into NuSMV or RED.
#[derive(Parser)]
#[deny(missing_docs)]
#[command(version, about, long_about)]
pub struct Cli {
    /// Path of the model's JSON file.
    #[arg(value_hint = clap::ValueHint::FilePath)]
    model: PathBuf,
    /// Verbose output
    #[command(flatten)]
    pub verbosity: clap_verbosity_flag::Verbosity,
    /// Actions to execute on the model.
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let model = self
            .model
            .file_name()
            .and_then(|os_str| os_str.to_str())
            .unwrap_or("model")
            .to_owned();

        eprint!("Processing model, please wait...");
        let system = fsmv_json::load(&self.model)?;
        eprintln!(" done");

        match self.command {
            Commands::Validate => {
                let prepared = prepare_all(&system, 0, &mut |_| {})?;
                let diagnostics: usize = prepared.iter().map(|p| p.diagnostics.len()).sum();
                println!(
                    "model '{model}' successfully validated ({diagnostics} unsupported expressions)"
                );
            }
            Commands::Domains { span, json } => {
                let prepared = prepare_all(&system, span, &mut |_| {})?;
                let stats = stats(&system, prepared.len());
                let domains: Vec<_> = prepared
                    .iter()
                    .map(|p| (p.automaton.name().to_owned(), p.domains.clone()))
                    .collect();
                let diagnostics: Vec<_> = prepared
                    .into_iter()
                    .flat_map(|p| p.diagnostics)
                    .collect();
                Report::new(model, None, stats, &domains, &diagnostics).print(json);
            }
            Commands::Smv(args) => {
                let target = Target::Smv(args.formula()?);
                run_translation(model, &system, &target, &args.output)?;
            }
            Commands::Red(args) => {
                let target = Target::Red(args.options()?);
                run_translation(model, &system, &target, &args.output)?;
            }
        }
        Ok(())
    }
}

fn stats(system: &System, automata: usize) -> Stats {
    let mut stats = Stats {
        automata,
        ..Stats::default()
    };
    for entity in &system.entities {
        match entity {
            Entity::Fsm(_) => {}
            Entity::Clock(_) => stats.clocks += 1,
            Entity::Delay(_) => stats.delays += 1,
        }
    }
    stats
}

fn run_translation(
    model: String,
    system: &System,
    target: &Target,
    args: &OutputArgs,
) -> anyhow::Result<()> {
    let translation = if let Some(bar) = args.progress {
        let bar = bar.entities(&model, system.entities.len())?;
        let translation = translate(system, target, args.span, |name| progress::advance(&bar, name));
        bar.finish_and_clear();
        translation?
    } else {
        eprint!("Translation in progress...");
        let translation = translate(system, target, args.span, |_| {})?;
        eprintln!(" done!");
        translation
    };

    let mut report = Report::new(
        model,
        Some(target.name()),
        translation.stats,
        &translation.domains,
        &translation.diagnostics,
    );
    if let Some(path) = &args.output {
        write_output(path, &translation.text)?;
        report.output = Some(path.display().to_string());
        report.print(args.json);
    } else {
        print!("{}", translation.text);
        report.eprint(args.json);
    }
    Ok(())
}

fn write_output(path: &Path, text: &str) -> anyhow::Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create file '{}'", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(text.as_bytes())
            .with_context(|| format!("failed to write to file '{}'", path.display()))?;
        encoder
            .finish()
            .with_context(|| format!("failed to compress file '{}'", path.display()))?;
    } else {
        let mut file = file;
        file.write_all(text.as_bytes())
            .with_context(|| format!("failed to write to file '{}'", path.display()))?;
    }
    info!(target: "output", "translation written to '{}'", path.display());
    Ok(())
}

// From Clap tutorial <https://docs.rs/clap/latest/clap/_derive/_tutorial/index.html#testing>
#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
