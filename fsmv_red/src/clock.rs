use crate::{Process, Program, ident};
use fsmv_core::ClockActor;
use std::collections::BTreeSet;
use std::fmt::{self, Write};

/// Renders a clock ticking every period, until it reaches its stop time or cycle count.
pub(crate) fn render(
    clock: &ClockActor,
    received: &BTreeSet<String>,
    program: &mut Program,
) -> fmt::Result {
    let name = ident(&clock.name);
    let period = format!("{name}_PERIOD");
    let c1 = format!("{name}_C1");
    let init = format!("{name}_init");
    let idle = format!("{name}_idle");
    program.defines.push(format!("{period} {}", clock.period));
    program.clocks.push(c1.clone());

    let mut invariant = vec![format!("{c1} <= {period}")];
    let mut tick_guard = vec![format!("{c1} == {period}")];
    let mut tick_updates = String::new();
    let mut stops = Vec::new();
    if let Some(stop_time) = clock.stop_time {
        let stop = format!("{name}_STOP_TIME");
        let c2 = format!("{name}_C2");
        program.defines.push(format!("{stop} {stop_time}"));
        program.clocks.push(c2.clone());
        invariant.push(format!("{c2} <= {stop}"));
        stops.push(format!("{c2} == {stop}"));
    }
    if let Some(cycles) = clock.cycles {
        let stop = format!("{name}_STOP_CYCLE_COUNT");
        let cycle = format!("{name}_Cycle");
        program.defines.push(format!("{stop} {cycles}"));
        program.discretes.push(format!("{cycle}:0..{cycles}"));
        program.initial_values.push(format!("{cycle} == 0"));
        tick_guard.push(format!("{cycle} < {stop}"));
        tick_updates.push_str(&format!("{cycle} = {cycle} + 1 ; "));
        stops.push(format!("{cycle} == {stop}"));
    }
    let tick = match program.emit(&clock.output, received) {
        Some(emit) => format!("{emit} "),
        None => String::new(),
    };

    let modes = &mut program.modes;
    writeln!(modes)?;
    writeln!(modes, "/* Process name: {} */", clock.name)?;
    writeln!(modes, "mode {init} ({}) {{", invariant.join(" && "))?;
    writeln!(
        modes,
        "    when {tick}({}) may {tick_updates}{c1} = 0 ; goto {init} ;",
        tick_guard.join(" && ")
    )?;
    for stop in stops {
        writeln!(modes, "    when ({stop}) may goto {idle} ;")?;
    }
    writeln!(modes, "}}")?;
    writeln!(modes, "mode {idle} (true) {{")?;
    writeln!(modes, "}}")?;

    program.processes.push(Process {
        name: clock.name.clone(),
        initial: init,
    });
    Ok(())
}
