//! Scenario harness for the automata engines.
//!
//! Combines the example protocols with standard graph shapes and runs them
//! on either the deterministic engine or the parallel runtime, collecting a
//! uniform [`ScenarioOutcome`] either way. The `ioa-simulator` binary is a
//! thin CLI over this crate.

pub mod config;
pub mod parallel;
pub mod runner;
pub mod topologies;

pub use config::{Protocol, ScenarioConfig};
pub use parallel::{ParallelScenario, ParallelScenarioError};
pub use runner::{ScenarioError, ScenarioOutcome, ScenarioRunner};
pub use topologies::TopologyShape;
