use crate::{PortDiscipline, Process, Program, RedError, RedOptions, check_idents, ident, port};
use fsmv_core::{
    ArithOp, Automaton, Comparison, Domains, StateId, TransitionEncoding, Update, encode_state,
};
use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt::Write;

// `N_State_S`, or its birth copy.
fn mode(automaton: &str, state: &str, birth: bool) -> String {
    if birth {
        format!("{automaton}_State_{state}_Birth")
    } else {
        format!("{automaton}_State_{state}")
    }
}

fn comparison(prefix: &str, comparison: &Comparison) -> String {
    format!("{prefix}_{comparison}")
}

fn update(prefix: &str, var: &str, update: &Update) -> String {
    match update {
        Update::Constant(value) => format!("{prefix}_{var} = {value} ;"),
        Update::Offset {
            source,
            op,
            operand,
        } => {
            let (op, operand) = match (op, *operand < 0) {
                (ArithOp::Add, true) => (ArithOp::Sub, operand.unsigned_abs().to_string()),
                (ArithOp::Sub, true) => (ArithOp::Add, operand.unsigned_abs().to_string()),
                (op, true) => (*op, format!("({operand})")),
                (op, false) => (*op, operand.to_string()),
            };
            format!("{prefix}_{var} = {prefix}_{source} {op} {operand} ;")
        }
    }
}

// The guard of an edge: the clock condition, then the comparisons.
fn guard(prefix: &str, edge: &TransitionEncoding, birth: bool) -> String {
    let mut conjuncts = vec![if birth { "t>=0" } else { "t>0" }.to_owned()];
    conjuncts.extend(edge.preconditions.iter().map(|c| comparison(prefix, c)));
    for negation in &edge.negated {
        let disjuncts: Vec<String> = negation.iter().map(|c| comparison(prefix, c)).collect();
        match disjuncts.as_slice() {
            [single] => conjuncts.push(single.clone()),
            _ => conjuncts.push(format!("({})", disjuncts.join(" || "))),
        }
    }
    conjuncts.join(" && ")
}

fn edge(
    automaton: &Automaton,
    domains: &Domains,
    prefix: &str,
    edge: &TransitionEncoding,
    birth: bool,
    received: &BTreeSet<String>,
    program: &mut Program,
) -> String {
    let mut sync: SmallVec<[String; 4]> = SmallVec::new();
    for input in &edge.inputs {
        let synchronizer = format!("ND_{prefix}_{}", ident(input));
        program.synchronizers.insert(synchronizer.clone());
        sync.push(format!("?{synchronizer}"));
    }
    sync.extend(
        edge.outputs
            .iter()
            .filter_map(|output| program.emit(output, received)),
    );
    let mut line = String::from("    when ");
    for part in &sync {
        line.push_str(part);
        line.push(' ');
    }
    line.push_str(&format!("({}) may ", guard(prefix, edge, birth)));
    for assignment in &edge.updates {
        // reported as unsupported when preparing the automaton
        if let Update::Offset { source, .. } = &assignment.update {
            if domains.get(source).is_none() {
                trace!("`{source}` has no domain, skipping update of `{}` in `{}`", assignment.var, edge.name);
                continue;
            }
        }
        line.push_str(&update(prefix, &assignment.var, &assignment.update));
        line.push(' ');
    }
    let target = ident(automaton.state_name(edge.target));
    line.push_str(&format!("t = 0 ; goto {} ;", mode(prefix, &target, false)));
    line
}

fn write_mode(
    automaton: &Automaton,
    domains: &Domains,
    prefix: &str,
    state: StateId,
    birth: bool,
    inputs: &BTreeSet<&str>,
    received: &BTreeSet<String>,
    program: &mut Program,
) -> Result<(), RedError> {
    let name = mode(prefix, &ident(automaton.state_name(state)), birth);
    let mut text = String::new();
    writeln!(text, "mode {name} (true) {{")?;
    for encoding in encode_state(automaton, state, inputs) {
        writeln!(text, "{}", edge(automaton, domains, prefix, &encoding, birth, received, program))?;
    }
    writeln!(text, "}}")?;
    program.modes.push_str(&text);
    Ok(())
}

pub(crate) fn render(
    automaton: &Automaton,
    domains: &Domains,
    options: &RedOptions,
    received: &BTreeSet<String>,
    program: &mut Program,
) -> Result<(), RedError> {
    let prefix = ident(automaton.name());
    let inputs = automaton.input_signals();
    // unreachable states may read variables without a domain
    let reachable: BTreeSet<StateId> = automaton.reachable().into_iter().collect();
    check_idents(
        automaton.name(),
        reachable.iter().map(|state| automaton.state_name(*state)),
    )?;
    let initial = automaton.initial();
    program.processes.push(Process {
        name: automaton.name().to_owned(),
        initial: mode(&prefix, &ident(automaton.state_name(initial)), true),
    });

    for (var, interval) in domains.variables() {
        program
            .discretes
            .push(format!("{prefix}_{var}:{}..{}", interval.min(), interval.max()));
        let init = automaton
            .variables()
            .get(var)
            .copied()
            .unwrap_or(interval.min());
        program.initial_values.push(format!("{prefix}_{var} == {init}"));
    }

    writeln!(program.modes)?;
    writeln!(program.modes, "/* Process name: {} */", automaton.name())?;
    write_mode(automaton, domains, &prefix, initial, true, &inputs, received, program)?;
    for state in reachable {
        write_mode(automaton, domains, &prefix, state, false, &inputs, received, program)?;
    }

    if options.ports == PortDiscipline::Counted && !inputs.is_empty() {
        program
            .defines
            .push(format!("{prefix}_BUFFER_SIZE {}", options.buffer_size));
    }
    for input in &inputs {
        port::render(&prefix, input, options, program)?;
    }
    debug!(
        "process `{}` with {} ports and {} variables",
        automaton.name(),
        inputs.len(),
        domains.variables().count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{RedBuilder, RedOptions};
    use fsmv_core::{AutomatonBuilder, Label, TranslationError, prepare};

    fn red(builder: AutomatonBuilder) -> Result<String, TranslationError> {
        let prepared = prepare(&builder.build()?, 0)?;
        let mut red = RedBuilder::new(RedOptions::default());
        red.add_automaton(&prepared.automaton, &prepared.domains)
            .expect("add automaton");
        Ok(red.build().expect("build"))
    }

    #[test]
    fn complementary_edge() -> Result<(), TranslationError> {
        let mut builder = AutomatonBuilder::new("N");
        let s = builder.new_initial_state("S")?;
        let t = builder.new_state("T")?;
        builder.add_transition("go", s, t, Label::new().guard("P_isPresent && x > 5"))?;
        builder.add_transition("set", t, s, Label::new().guard("P_isPresent").set("x = 10"))?;
        builder.add_transition("reset", t, s, Label::new().guard("P_isPresent").set("x = 0"))?;
        let text = red(builder)?;
        assert!(text.contains("global discrete N_x:0..10;"));
        assert!(text.contains("mode N_State_S_Birth (true) {"));
        assert!(text.contains("    when ?ND_N_P (t>0 && N_x > 5) may t = 0 ; goto N_State_T ;"));
        assert!(text.contains("    when ?ND_N_P (t>0 && N_x <= 5) may t = 0 ; goto N_State_S ;"));
        assert!(text.contains("    when ?ND_N_P (t>=0 && N_x <= 5) may t = 0 ; goto N_State_S ;"));
        assert!(text.contains("    when ?ND_N_P (t>0) may N_x = 10 ; t = 0 ; goto N_State_S ;"));
        assert!(text.contains("N_x == 0"));
        Ok(())
    }

    #[test]
    fn disjunctive_still_move() -> Result<(), TranslationError> {
        let mut builder = AutomatonBuilder::new("N");
        let s = builder.new_initial_state("S")?;
        builder.add_transition(
            "band",
            s,
            s,
            Label::new().guard("P_isPresent && x > 1 && x < 4").set("x = x + (-1)"),
        )?;
        let text = red(builder)?;
        assert!(text.contains("(t>0 && N_x > 1 && N_x < 4) may N_x = N_x - 1 ; t = 0 ;"));
        assert!(text.contains("    when ?ND_N_P (t>0 && (N_x <= 1 || N_x >= 4)) may t = 0 ; goto N_State_S ;"));
        Ok(())
    }

    #[test]
    fn outputs_and_always_guards() -> Result<(), TranslationError> {
        let mut sender = AutomatonBuilder::new("Sender");
        let a = sender.new_initial_state("A")?;
        sender.add_transition("send", a, a, Label::new().output("req = 1; log = 1"))?;
        let mut receiver = AutomatonBuilder::new("Receiver");
        let r = receiver.new_initial_state("R")?;
        receiver.add_transition("any", r, r, Label::new().set("n = n * (-2)"))?;
        receiver.add_transition("got", r, r, Label::new().guard("req_isPresent && n == 1"))?;

        let sender = prepare(&sender.build()?, 0)?;
        let receiver = prepare(&receiver.build()?, 0)?;
        let mut red = RedBuilder::new(RedOptions::default());
        red.add_automaton(&sender.automaton, &sender.domains).expect("sender");
        red.add_automaton(&receiver.automaton, &receiver.domains).expect("receiver");
        let text = red.build().expect("build");
        // `log` has no receiver, and `Sender` has no inputs
        assert!(text.contains("    when !req (t>0) may t = 0 ; goto Sender_State_A ;"));
        assert!(!text.contains("!log"));
        // the always guard is expanded on `req`, so no still move is needed
        assert!(text.contains("    when ?ND_Receiver_req (t>0) may Receiver_n = Receiver_n * (-2) ; t = 0 ; goto Receiver_State_R ;"));
        assert!(!text.contains("(t>0 && Receiver_n != 1)"));
        assert!(text.contains("Process 1: Sender\nProcess 2: Receiver\nProcess 3: Receiver_Port_req\n"));
        Ok(())
    }
}
