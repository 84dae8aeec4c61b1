//! Concurrent (non-deterministic) execution for multi-core runs.
//!
//! Unlike the deterministic `ioa-engine` crate, which interleaves all
//! nodes on a single scheduler thread, this crate runs each node as an
//! independent tokio task. Runs are faster on real workloads and their
//! interleavings are real concurrency, at the cost of reproducibility.
//!
//! # Goals
//!
//! 1. **Per-node parallelism**: each node runs in its own tokio task
//! 2. **Same local semantics**: FIFO queues, alphabet checks, destination
//!    and emission enforcement all match the deterministic engine
//! 3. **Shared vocabulary**: injection errors, sinks, and reports are the
//!    `ioa-engine` types
//!
//! # Non-Goals
//!
//! - **Determinism**: interleavings vary between runs; use `ioa-engine`
//!   with a seeded policy when reproducibility matters
//! - **Bounded queues**: channels are unbounded here, so queue overflow
//!   is not observable in this runtime
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ParallelEngine                         │
//! │                (orchestrator - caller's task)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │   ┌───────────┐   ┌───────────┐   ┌───────────┐             │
//! │   │  Node 0   │   │  Node 1   │   │  Node 2   │  ...        │
//! │   │  (task)   │   │  (task)   │   │  (task)   │             │
//! │   │           │   │           │   │           │             │
//! │   │ ┌───────┐ │   │ ┌───────┐ │   │ ┌───────┐ │             │
//! │   │ │ State │ │   │ │ State │ │   │ │ State │ │             │
//! │   │ │+Queue │ │   │ │+Queue │ │   │ │+Queue │ │             │
//! │   │ └───────┘ │   │ └───────┘ │   │ └───────┘ │             │
//! │   └─────┬─────┘   └─────┬─────┘   └─────┬─────┘             │
//! │         │               │               │                   │
//! │         └───────────────┼───────────────┘                   │
//! │                         │                                   │
//! │               ┌─────────▼─────────┐                         │
//! │               │   MessageRouter   │                         │
//! │               │ (graph + sinks +  │                         │
//! │               │  stat counters)   │                         │
//! │               └───────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Action firing happens inline within each node task; only routing
//! crosses task boundaries.

mod node_task;
mod router;
mod runtime;

pub use router::RouterStats;
pub use runtime::{ParallelEngine, ParallelError};
