use crate::translate::Stats;
use fsmv_core::{Domains, UnsupportedExpression};
use serde::Serialize;
use std::{collections::BTreeMap, fmt::Display};

#[derive(Serialize)]
pub(crate) struct Report {
    pub(crate) model: String,
    pub(crate) target: Option<&'static str>,
    pub(crate) output: Option<String>,
    pub(crate) automata: usize,
    pub(crate) clocks: usize,
    pub(crate) delays: usize,
    pub(crate) skipped: usize,
    pub(crate) domains: BTreeMap<String, BTreeMap<String, String>>,
    pub(crate) diagnostics: Vec<String>,
}

impl Report {
    pub(crate) fn new(
        model: String,
        target: Option<&'static str>,
        stats: Stats,
        domains: &[(String, Domains)],
        diagnostics: &[UnsupportedExpression],
    ) -> Self {
        let domains = domains
            .iter()
            .map(|(automaton, domains)| {
                let intervals = domains
                    .variables()
                    .map(|(var, interval)| (var.to_owned(), interval.to_string()))
                    .chain(domains.signals().map(|signal| (signal.to_owned(), "0..1".to_owned())))
                    .collect();
                (automaton.clone(), intervals)
            })
            .collect();
        Self {
            model,
            target,
            output: None,
            automata: stats.automata,
            clocks: stats.clocks,
            delays: stats.delays,
            skipped: stats.skipped,
            domains,
            diagnostics: diagnostics.iter().map(ToString::to_string).collect(),
        }
    }

    fn render(&self, json: bool) -> String {
        if json {
            serde_json::ser::to_string_pretty(&self).expect("report serialization")
        } else {
            self.to_string()
        }
    }

    pub(crate) fn print(&self, json: bool) {
        println!("{}", self.render(json));
    }

    // When the standard output is taken by the translation.
    pub(crate) fn eprint(&self, json: bool) {
        eprintln!("{}", self.render(json));
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target {
            Some(target) => writeln!(f, "FSMV translation of {} to {target}", self.model)?,
            None => writeln!(f, "FSMV analysis of {}", self.model)?,
        }
        write!(
            f,
            "{} automata, {} clocks, {} delays",
            self.automata, self.clocks, self.delays
        )?;
        if self.skipped > 0 {
            write!(f, " ({} timed entities skipped)", self.skipped)?;
        }
        writeln!(f)?;
        for (automaton, domains) in &self.domains {
            writeln!(f, "{automaton}:")?;
            for (var, interval) in domains {
                writeln!(f, "  {var} in {interval}")?;
            }
        }
        for diagnostic in &self.diagnostics {
            writeln!(f, "warning: {diagnostic}")?;
        }
        if let Some(output) = &self.output {
            write!(f, "Written to {output}")?;
        } else {
            write!(f, "{} unsupported expressions", self.diagnostics.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsmv_core::{AutomatonBuilder, Label, TranslationError, prepare};

    #[test]
    fn domains_and_diagnostics() -> Result<(), TranslationError> {
        let mut builder = AutomatonBuilder::new("M");
        let a = builder.new_initial_state("A")?;
        builder.add_transition("t", a, a, Label::new().guard("go_isPresent && x < 3 || y > 1"))?;
        builder.add_transition("u", a, a, Label::new().guard("go_isPresent && x < 3"))?;
        let prepared = prepare(&builder.build()?, 1)?;
        let stats = Stats {
            automata: 1,
            ..Stats::default()
        };
        let report = Report::new(
            "m.json".to_owned(),
            Some("smv"),
            stats,
            &[("M".to_owned(), prepared.domains)],
            &prepared.diagnostics,
        );
        assert_eq!(report.domains["M"]["x"], "2..4");
        assert_eq!(report.domains["M"]["go"], "0..1");
        assert_eq!(report.diagnostics.len(), 1);
        let text = report.to_string();
        assert!(text.starts_with("FSMV translation of m.json to smv\n1 automata, 0 clocks, 0 delays\n"));
        assert!(text.ends_with("1 unsupported expressions"));
        assert_eq!(report.render(false), text);
        let json: serde_json::Value =
            serde_json::from_str(&report.render(true)).expect("valid JSON");
        assert_eq!(json["target"], "smv");
        assert_eq!(json["domains"]["M"]["x"], "2..4");
        assert_eq!(json["output"], serde_json::Value::Null);
        Ok(())
    }
}
