use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};

/// Translation progress bar
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum Bar {
    /// Fancy Unicode progress bars
    #[default]
    Unicode,
    /// Basic ASCII progress bars
    Ascii,
}

impl Bar {
    /// A bar over the `len` entities of `model`.
    pub(crate) fn entities(self, model: &str, len: usize) -> anyhow::Result<ProgressBar> {
        const FINE_BAR: &str = "█▉▊▋▌▍▎▏  ";
        const ASCII_BAR: &str = "#--";

        let style = if let Bar::Ascii = self {
            ProgressStyle::with_template("{bar:40} {pos}/{len} {prefix} {msg}")?
                .progress_chars(ASCII_BAR)
        } else {
            ProgressStyle::with_template("{bar:40.white.on_black} {pos}/{len} {prefix} {msg}")?
                .progress_chars(FINE_BAR)
        };
        Ok(ProgressBar::new(len as u64)
            .with_style(style)
            .with_prefix(format!("translating {model}:")))
    }
}

/// Advances `bar` past the entity `name`.
pub(crate) fn advance(bar: &ProgressBar, name: &str) {
    bar.set_message(name.to_owned());
    bar.inc(1);
}
