//! Serde representation of the JSON model format.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Model {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) semantics: Option<Semantics>,
    #[serde(default)]
    pub(crate) entities: Vec<Entity>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) enum Semantics {
    #[serde(rename = "sr")]
    SynchronousReactive,
    #[serde(rename = "de")]
    DiscreteEvent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Entity {
    Fsm(Fsm),
    Clock(Clock),
    TimedDelay(Delay),
    NondeterministicDelay(Delay),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Fsm {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) variables: BTreeMap<String, i64>,
    pub(crate) states: Vec<State>,
    #[serde(default)]
    pub(crate) transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct State {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) initial: bool,
    #[serde(default)]
    pub(crate) refinements: Vec<Fsm>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Transition {
    pub(crate) name: String,
    pub(crate) source: String,
    pub(crate) target: String,
    #[serde(default)]
    pub(crate) guard: String,
    #[serde(default)]
    pub(crate) set: String,
    #[serde(default)]
    pub(crate) output: String,
    #[serde(default)]
    pub(crate) annotation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Clock {
    pub(crate) name: String,
    pub(crate) period: f64,
    #[serde(default)]
    pub(crate) stop_time: Option<f64>,
    #[serde(default)]
    pub(crate) cycles: Option<u32>,
    pub(crate) output: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Delay {
    pub(crate) name: String,
    pub(crate) delay: f64,
    #[serde(default = "default_buffer_size")]
    pub(crate) buffer_size: u32,
    pub(crate) input: String,
    pub(crate) output: String,
}

fn default_buffer_size() -> u32 {
    1
}
