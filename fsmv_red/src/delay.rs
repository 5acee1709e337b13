use crate::{Process, Program, ident};
use fsmv_core::{DelayActor, DelayKind};
use std::collections::BTreeSet;
use std::fmt::{self, Write};

// Occupancy of the buffer slots, slot 0 being the leftmost bit of the mode name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slots {
    bits: u32,
    size: u32,
}

impl Slots {
    fn is_occupied(self, slot: u32) -> bool {
        self.bits & (1 << (self.size - 1 - slot)) != 0
    }

    fn toggle(self, slot: u32) -> Self {
        Self {
            bits: self.bits ^ (1 << (self.size - 1 - slot)),
            size: self.size,
        }
    }

    fn mode(self, prefix: &str) -> String {
        let bits: String = (0..self.size)
            .map(|slot| if self.is_occupied(slot) { '1' } else { '0' })
            .collect();
        format!("{prefix}_S{bits}")
    }
}

/// Renders a buffer of `buffer_size` slots, each with its own clock.
pub(crate) fn render(
    delay: &DelayActor,
    received: &BTreeSet<String>,
    program: &mut Program,
) -> fmt::Result {
    let name = ident(&delay.name);
    let bound = format!("{name}_DELAY");
    let size = delay.buffer_size;
    let clocks: Vec<String> = (0..size).map(|slot| format!("{name}_C{slot}")).collect();
    program.defines.push(format!("{bound} {}", delay.delay));
    program.clocks.extend(clocks.iter().cloned());
    let receive = program.receive(&delay.input);
    let emit = match program.emit(&delay.output, received) {
        Some(emit) => format!("{emit} "),
        None => String::new(),
    };
    let release = match delay.kind {
        DelayKind::Timed => "==",
        DelayKind::Nondeterministic => "<=",
    };

    let modes = &mut program.modes;
    writeln!(modes)?;
    writeln!(modes, "/* Process name: {} */", delay.name)?;
    for bits in 0..1u32 << size {
        let slots = Slots { bits, size };
        let invariant: Vec<String> = (0..size)
            .filter(|slot| slots.is_occupied(*slot))
            .map(|slot| format!("{} <= {bound}", clocks[slot as usize]))
            .collect();
        let invariant = if invariant.is_empty() {
            "true".to_owned()
        } else {
            invariant.join(" && ")
        };
        writeln!(modes, "mode {} ({invariant}) {{", slots.mode(&name))?;
        match (0..size).rev().find(|slot| !slots.is_occupied(*slot)) {
            Some(free) => writeln!(
                modes,
                "    when {receive} (true) may {} = 0 ; goto {} ;",
                clocks[free as usize],
                slots.toggle(free).mode(&name)
            )?,
            None => writeln!(modes, "    when {receive} (true) may goto Buffer_Overflow ;")?,
        }
        for slot in (0..size).filter(|slot| slots.is_occupied(*slot)) {
            writeln!(
                modes,
                "    when {emit}({} {release} {bound}) may goto {} ;",
                clocks[slot as usize],
                slots.toggle(slot).mode(&name)
            )?;
        }
        writeln!(modes, "}}")?;
    }

    program.processes.push(Process {
        name: delay.name.clone(),
        initial: Slots { bits: 0, size }.mode(&name),
    });
    Ok(())
}
