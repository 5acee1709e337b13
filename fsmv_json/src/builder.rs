use crate::parser::{self, Model};
use anyhow::{Context, anyhow};
use fsmv_core::{
    Automaton, AutomatonBuilder, ClockActor, DelayActor, DelayKind, Entity, Label, Semantics,
    System,
};
use log::{debug, trace};
use std::collections::HashMap;

pub(crate) fn build(model: Model) -> anyhow::Result<System> {
    let entities = model
        .entities
        .into_iter()
        .map(|entity| match entity {
            parser::Entity::Fsm(fsm) => {
                let name = fsm.name.clone();
                build_fsm(fsm)
                    .map(Entity::Fsm)
                    .with_context(|| format!("failed to build automaton '{name}'"))
            }
            parser::Entity::Clock(clock) => Ok(Entity::Clock(ClockActor {
                name: clock.name,
                period: clock.period,
                stop_time: clock.stop_time,
                cycles: clock.cycles,
                output: clock.output,
            })),
            parser::Entity::TimedDelay(delay) => Ok(Entity::Delay(delay_actor(delay, DelayKind::Timed))),
            parser::Entity::NondeterministicDelay(delay) => Ok(Entity::Delay(delay_actor(
                delay,
                DelayKind::Nondeterministic,
            ))),
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(System {
        name: model.name,
        semantics: model.semantics.map(|semantics| match semantics {
            parser::Semantics::SynchronousReactive => Semantics::SynchronousReactive,
            parser::Semantics::DiscreteEvent => Semantics::DiscreteEvent,
        }),
        entities,
    })
}

fn delay_actor(delay: parser::Delay, kind: DelayKind) -> DelayActor {
    DelayActor {
        name: delay.name,
        kind,
        delay: delay.delay,
        buffer_size: delay.buffer_size,
        input: delay.input,
        output: delay.output,
    }
}

fn build_fsm(fsm: parser::Fsm) -> anyhow::Result<Automaton> {
    let mut builder = AutomatonBuilder::new(fsm.name);
    let mut states = HashMap::new();
    for state in fsm.states {
        let id = if state.initial {
            builder.new_initial_state(&state.name)?
        } else {
            builder.new_state(&state.name)?
        };
        for refinement in state.refinements {
            let refinement_name = refinement.name.clone();
            let refinement = build_fsm(refinement)
                .with_context(|| format!("failed to build refinement '{refinement_name}'"))?;
            builder.add_refinement(id, refinement)?;
        }
        trace!("state '{}'", state.name);
        states.insert(state.name, id);
    }
    for (var, init) in fsm.variables {
        builder.new_var(var, init)?;
    }
    for transition in fsm.transitions {
        let source = *states.get(&transition.source).ok_or_else(|| {
            anyhow!(
                "transition '{}' leaves unknown state '{}'",
                transition.name,
                transition.source
            )
        })?;
        let target = *states.get(&transition.target).ok_or_else(|| {
            anyhow!(
                "transition '{}' enters unknown state '{}'",
                transition.name,
                transition.target
            )
        })?;
        let mut label = Label::new()
            .guard(transition.guard)
            .set(transition.set)
            .output(transition.output);
        if let Some(annotation) = transition.annotation {
            label = label.annotation(annotation);
        }
        builder
            .add_transition(&transition.name, source, target, label)
            .with_context(|| format!("failed to add transition '{}'", transition.name))?;
    }
    let automaton = builder.build()?;
    debug!(
        "automaton '{}' with {} states and {} transitions",
        automaton.name(),
        automaton.states().len(),
        automaton.transitions().len()
    );
    Ok(automaton)
}
