//! Fatal engine failures.

use ioa_types::{Destination, NodeIndex};
use thiserror::Error;

/// Failures that halt a run. The offending step never completes partially:
/// destination and emission checks run before any queue append for the
/// entry that failed.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An output action addressed something it may not reach.
    #[error("output action '{action}' of {node} addressed {destination}, which is neither a neighbor nor the node's external user")]
    IllegalDestination {
        node: NodeIndex,
        action: &'static str,
        destination: Destination,
    },

    /// A routed message would exceed a configured queue bound.
    #[error("input queue of {node} exceeded its configured capacity of {capacity}")]
    QueueOverflow { node: NodeIndex, capacity: usize },

    /// An output action emitted a payload type outside its declared set.
    #[error("output action '{action}' of {node} emitted {message_type}, which it does not declare")]
    UndeclaredEmission {
        node: NodeIndex,
        action: &'static str,
        message_type: &'static str,
    },

    /// `run` called on an engine that already halted.
    #[error("engine has already halted")]
    AlreadyHalted,
}
