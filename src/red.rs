use crate::OutputArgs;
use anyhow::{anyhow, bail};
use clap::{Parser, ValueEnum};
use fsmv_red::{MAX_BUFFER_SIZE, PortDiscipline, RedOptions, Specification};

const SPEC_ERR: &str = "the --buffer-overflow flag is incompatible with a formula.\n
Examples:
'fsmv PATH/TO/MODEL red --buffer-overflow' checks whether any buffer can overflow
'fsmv PATH/TO/MODEL red --formula FORMULA' copies FORMULA into the specification section";

/// How ports buffer the signals of state machines.
#[deny(missing_docs)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum Ports {
    /// A single token, that must be consumed in the same instant it arrives.
    #[default]
    Token,
    /// A counter of pending tokens, up to the buffer size.
    Counted,
}

/// Translate the model into RED.
#[derive(Debug, Clone, Parser)]
#[deny(missing_docs)]
pub(crate) struct RedArgs {
    /// Specification, copied verbatim at the end of the program.
    #[arg(short, long)]
    pub(crate) formula: Option<String>,
    /// Check the risk of any buffer overflowing.
    #[arg(short, long)]
    pub(crate) buffer_overflow: bool,
    /// How ports buffer the signals of state machines.
    #[arg(long, value_enum, default_value_t)]
    pub(crate) ports: Ports,
    /// Capacity of counted ports.
    #[arg(long, default_value_t = 1)]
    pub(crate) buffer_size: u32,
    /// Output options.
    #[clap(flatten)]
    pub(crate) output: OutputArgs,
}

impl RedArgs {
    pub(crate) fn options(&self) -> anyhow::Result<RedOptions> {
        if !(1..=MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            return Err(anyhow!(
                "buffer size must be between 1 and {MAX_BUFFER_SIZE}, found {}",
                self.buffer_size
            ));
        }
        let specification = match (&self.formula, self.buffer_overflow) {
            (Some(_), true) => bail!(SPEC_ERR),
            (Some(formula), false) => Specification::Formula(formula.trim().to_owned()),
            (None, true) => Specification::BufferOverflow,
            (None, false) => Specification::None,
        };
        Ok(RedOptions {
            ports: match self.ports {
                Ports::Token => PortDiscipline::Token,
                Ports::Counted => PortDiscipline::Counted,
            },
            buffer_size: self.buffer_size,
            specification,
        })
    }
}
