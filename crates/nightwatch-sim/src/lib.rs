//! Nightwatch Sim - headless driver for the guard AI.
//!
//! Loads a guard profile and a scripted perception timeline from TOML, runs
//! the guard through it at a fixed step and reports every signal emitted.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod runner;
pub mod scenario;

pub use runner::{RunReport, ScenarioRunner, ScriptedArbiter, TraceEntry};
pub use scenario::{EventKind, Scenario, ScenarioError, ScenarioEvent, ScenarioResult};
