//! Small distributed protocols expressed as automata.
//!
//! Each module exposes a state type and a `signature()` function; the
//! same signature is instantiated at every node of whatever graph the
//! caller picks. These double as executable examples of the action
//! model: inputs fold received messages into state, outputs gate
//! emission on predicates, and the election's decision rule runs as an
//! internal action.

pub mod broadcast;
pub mod election;
