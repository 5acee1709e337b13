//! Loader for systems of hierarchical state machines and timed actors described in JSON.
//!
//! A model lists its entities, each tagged by its `kind`:
//!
//! ```json
//! { "name": "lights", "semantics": "sr",
//!   "entities": [
//!     { "kind": "fsm", "name": "Light", "variables": { "n": 0 },
//!       "states": [ { "name": "Red", "initial": true }, { "name": "Green" } ],
//!       "transitions": [ { "name": "go", "source": "Red", "target": "Green",
//!                          "guard": "tick_isPresent && n < 3", "set": "n = n + 1" } ] },
//!     { "kind": "clock", "name": "C", "period": 1.0, "output": "tick" } ] }
//! ```
//!
//! Delays are either `timed_delay` or `nondeterministic_delay`,
//! and states may hold one `refinements` automaton, written as an `fsm` without `kind`.

mod builder;
mod parser;

use anyhow::Context;
use builder::build;
use fsmv_core::System;
use log::info;
use parser::Model;
use std::{fs::File, io::Read, path::Path};

/// Reads and builds the system described by the JSON file at `path`.
pub fn load(path: &Path) -> anyhow::Result<System> {
    let time = std::time::Instant::now();
    info!(target: "parser", "parsing model file '{}'", path.display());
    let mut file =
        File::open(path).with_context(|| format!("failed to open file '{}'", path.display()))?;
    let size = file.metadata().map(|data| data.len()).unwrap_or_default();
    let mut buf = String::new();
    buf.reserve(size as usize);
    file.read_to_string(&mut buf)
        .with_context(|| format!("failed to read file '{}' to string", path.display()))?;
    let system = parse(&buf).with_context(|| format!("failed to load model in '{}'", path.display()))?;
    info!("loading complete in {:?}", time.elapsed());
    Ok(system)
}

/// Builds the system described by a JSON string.
pub fn parse(json: &str) -> anyhow::Result<System> {
    let model: Model = serde_json::from_str(json).context("failed to parse model specification")?;
    let time = std::time::Instant::now();
    info!(target: "build", "building system '{}'", model.name);
    let system = build(model)?;
    info!("building system completed in {:?}", time.elapsed());
    Ok(system)
}
