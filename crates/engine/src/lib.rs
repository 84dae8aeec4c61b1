//! Deterministic execution of message-passing automata over a directed graph.
//!
//! [`Engine`] owns every node: per-node state, per-node FIFO queue, the
//! shared wiring graph, and the scheduler. One call to [`Engine::run`]
//! repeats the same step until halted:
//!
//! 1. observe a stop request, if any;
//! 2. observe the step limit, if one is configured;
//! 3. scan for an enabled action (queue heads enable inputs, predicates
//!    enable outputs and internals) under the scheduling policy;
//! 4. fire it and route whatever it emitted;
//! 5. if nothing was enabled, block until an injection or a stop arrives.
//!
//! Blocking rather than returning is what separates quiescence from
//! termination: a network with nothing to do is waiting on its
//! environment, not finished.
//!
//! [`Injector`] and [`StopHandle`] are the environment's side of the
//! contract; both are cheap to clone and safe to use from other threads
//! while the engine runs.

mod config;
mod engine;
mod error;
mod handles;
mod mailbox;
mod report;
mod router;
mod scheduler;
mod sink;

pub use config::{EngineConfig, SchedulingPolicy};
pub use engine::{Engine, Phase};
pub use error::EngineError;
pub use handles::{InjectError, Injector, StopHandle};
pub use report::{HaltReason, RunReport};
pub use sink::{ExternalDelivery, ExternalMailbox, ExternalSink};
