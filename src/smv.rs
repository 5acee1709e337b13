use crate::OutputArgs;
use anyhow::bail;
use clap::{Parser, ValueEnum};
use fsmv_smv::{Formula, Logic};

/// Temporal logic of the NuSMV property.
#[deny(missing_docs)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum FormulaKind {
    /// Computation tree logic, checked as SPEC.
    #[default]
    Ctl,
    /// Linear temporal logic, checked as LTLSPEC.
    Ltl,
}

/// Translate the model into NuSMV.
#[derive(Debug, Clone, Parser)]
#[deny(missing_docs)]
pub(crate) struct SmvArgs {
    /// Property to check, copied verbatim into the main module.
    ///
    /// EXAMPLE: --formula 'AG !(Light.state = Red & Pedestrian.state = Wait)'
    #[arg(short, long, verbatim_doc_comment)]
    pub(crate) formula: Option<String>,
    /// Temporal logic the formula is written in.
    #[arg(short, long, value_enum, default_value_t)]
    pub(crate) kind: FormulaKind,
    /// Output options.
    #[clap(flatten)]
    pub(crate) output: OutputArgs,
}

impl SmvArgs {
    pub(crate) fn formula(&self) -> anyhow::Result<Option<Formula>> {
        match &self.formula {
            Some(text) if text.trim().is_empty() => bail!("the formula is empty"),
            Some(text) => Ok(Some(Formula {
                logic: match self.kind {
                    FormulaKind::Ctl => Logic::Ctl,
                    FormulaKind::Ltl => Logic::Ltl,
                },
                text: text.trim().to_owned(),
            })),
            None => Ok(None),
        }
    }
}
