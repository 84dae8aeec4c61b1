//! Shared vocabulary for the ioa workspace.
//!
//! Node and external-user identifiers, message addressing (who sent a
//! message, where it is going), and the immutable communication graph that
//! every other crate reads.

mod ids;
mod topology;

pub use ids::{Destination, ExternalUserId, NodeIndex, Sender};
pub use topology::{Topology, TopologyError};
