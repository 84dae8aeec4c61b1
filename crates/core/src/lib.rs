//! Contract model for I/O-automata networks.
//!
//! An automaton is declared in three pieces:
//!
//! 1. A message [`Alphabet`]: which payload types it consumes (input
//!    catalog) and which it may emit (output catalog).
//! 2. A [`State`] type, one fresh value per node, owned exclusively by that
//!    node.
//! 3. Three action families bundled into a [`Signature`]:
//!    [`InputAction`]s deliver queued messages, [`OutputAction`]s emit an
//!    [`Outbox`] when their predicate holds, [`InternalAction`]s step local
//!    state.
//!
//! [`Signature::build`] is the single validation gate; everything an engine
//! runs has passed it. Each invocation receives a fresh [`ActionContext`]
//! as an explicit parameter with the graph-derived queries (neighbors, node
//! count, self index, external user) plus the sender during input delivery.
//!
//! Execution lives elsewhere: `ioa-engine` drives the deterministic
//! scheduler, `ioa-parallel` the threaded runtime. This crate is pure
//! contract, with no queues and no scheduling.

mod action;
mod alphabet;
mod context;
mod message;
mod outbox;
mod signature;
mod state;

pub use action::{InputAction, InternalAction, OutputAction};
pub use alphabet::{Alphabet, AlphabetBuilder};
pub use context::{ActionCategory, ActionContext, ContextError};
pub use message::{Message, MessageType, Payload};
pub use outbox::{Destinations, OutboundEnvelope, Outbox};
pub use signature::{Signature, ValidationError};
pub use state::State;
