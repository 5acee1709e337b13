use crate::{PortDiscipline, Process, Program, RedOptions, ident};
use std::fmt::{self, Write};

/// Renders the process buffering `signal` for the automaton `prefix`.
pub(crate) fn render(
    prefix: &str,
    signal: &str,
    options: &RedOptions,
    program: &mut Program,
) -> fmt::Result {
    let port = format!("{prefix}_Port_{}", ident(signal));
    let consume = format!("ND_{prefix}_{}", ident(signal));
    program.synchronizers.insert(consume.clone());
    let receive = program.receive(signal);
    let modes = &mut program.modes;
    writeln!(modes)?;
    writeln!(modes, "/* Process name: {port} */")?;
    let initial = match options.ports {
        PortDiscipline::Token => {
            let empty = format!("{port}_TokenEmpty");
            let occupied = format!("{port}_TokenOccupied");
            writeln!(modes, "mode {empty} (true) {{")?;
            writeln!(modes, "    when {receive} (true) may t = 0 ; goto {occupied} ;")?;
            writeln!(modes, "}}")?;
            writeln!(modes, "mode {occupied} (t == 0) {{")?;
            writeln!(modes, "    when !{consume} (true) may goto {empty} ;")?;
            writeln!(modes, "    when {receive} (true) may goto Buffer_Overflow ;")?;
            writeln!(modes, "}}")?;
            empty
        }
        PortDiscipline::Counted => {
            let count = format!("{prefix}_NumberOfSignals_{}", ident(signal));
            let size = format!("{prefix}_BUFFER_SIZE");
            writeln!(modes, "mode {port} (true) {{")?;
            writeln!(
                modes,
                "    when {receive} ({count} < {size}) may {count} = {count} + 1 ; goto {port} ;"
            )?;
            writeln!(
                modes,
                "    when !{consume} ({count} > 0) may {count} = {count} - 1 ; goto {port} ;"
            )?;
            writeln!(
                modes,
                "    when {receive} ({count} == {size}) may goto Buffer_Overflow ;"
            )?;
            writeln!(modes, "}}")?;
            program
                .discretes
                .push(format!("{count}:0..{}", options.buffer_size));
            program.initial_values.push(format!("{count} == 0"));
            port.clone()
        }
    };
    program.ports.push(Process {
        name: port,
        initial,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{PortDiscipline, RedBuilder, RedOptions};
    use fsmv_core::{AutomatonBuilder, Label, TranslationError, prepare};

    fn two_inputs(ports: PortDiscipline) -> Result<String, TranslationError> {
        let mut builder = AutomatonBuilder::new("N");
        let s = builder.new_initial_state("S")?;
        builder.add_transition("a", s, s, Label::new().guard("A_isPresent"))?;
        builder.add_transition("b", s, s, Label::new().guard("B_isPresent"))?;
        let prepared = prepare(&builder.build()?, 0)?;
        let options = RedOptions {
            ports,
            buffer_size: 3,
            ..RedOptions::default()
        };
        let mut red = RedBuilder::new(options);
        red.add_automaton(&prepared.automaton, &prepared.domains)
            .expect("add automaton");
        Ok(red.build().expect("build"))
    }

    #[test]
    fn token_ports() -> Result<(), TranslationError> {
        let text = two_inputs(PortDiscipline::Token)?;
        assert!(text.contains("process count = 3;"));
        assert!(text.contains(
            "mode N_Port_A_TokenEmpty (true) {\n    when ?A (true) may t = 0 ; goto N_Port_A_TokenOccupied ;\n}"
        ));
        assert!(text.contains(
            "mode N_Port_B_TokenOccupied (t == 0) {\n    when !ND_N_B (true) may goto N_Port_B_TokenEmpty ;\n    when ?B (true) may goto Buffer_Overflow ;\n}"
        ));
        assert!(!text.contains("#define"));
        Ok(())
    }

    #[test]
    fn counted_ports() -> Result<(), TranslationError> {
        let text = two_inputs(PortDiscipline::Counted)?;
        assert!(text.contains("#define N_BUFFER_SIZE 3\n"));
        assert!(text.contains("global discrete N_NumberOfSignals_A:0..3;"));
        assert!(text.contains(
            "    when ?A (N_NumberOfSignals_A < N_BUFFER_SIZE) may N_NumberOfSignals_A = N_NumberOfSignals_A + 1 ; goto N_Port_A ;"
        ));
        assert!(text.contains(
            "    when !ND_N_B (N_NumberOfSignals_B > 0) may N_NumberOfSignals_B = N_NumberOfSignals_B - 1 ; goto N_Port_B ;"
        ));
        assert!(text.contains("    when ?B (N_NumberOfSignals_B == N_BUFFER_SIZE) may goto Buffer_Overflow ;"));
        assert!(text.contains("N_Port_A[2] &&\n    N_Port_B[3] &&\n    N_NumberOfSignals_A == 0 &&"));
        Ok(())
    }
}
