//! Identifiers for automata and external users.

use std::fmt;

/// Index of an automaton in the network, in `0..node_count`.
///
/// Doubles as the row/column index into the underlying adjacency relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// Widen to a usize for indexing into per-node storage.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}", self.0)
    }
}

/// Opaque identifier for a non-graph addressee.
///
/// Each node is associated with exactly one external user it may address;
/// messages sent there leave the network through a registered sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalUserId(pub u32);

impl ExternalUserId {
    /// The external user associated with a node (fixed one-to-one mapping).
    pub fn for_node(node: NodeIndex) -> Self {
        ExternalUserId(node.0)
    }
}

impl fmt::Display for ExternalUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "external user {}", self.0)
    }
}

/// Where a message is going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Append to a graph node's input queue.
    Node(NodeIndex),
    /// Hand to the external sink behind this user id.
    External(ExternalUserId),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Node(n) => write!(f, "{n}"),
            Destination::External(u) => write!(f, "{u}"),
        }
    }
}

/// Who emitted a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    /// Emitted by a graph node's output action.
    Node(NodeIndex),
    /// Injected from outside the graph.
    External(ExternalUserId),
}

impl Sender {
    /// The node index, if the sender is a graph node.
    pub fn node(self) -> Option<NodeIndex> {
        match self {
            Sender::Node(n) => Some(n),
            Sender::External(_) => None,
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Node(n) => write!(f, "{n}"),
            Sender::External(u) => write!(f, "{u}"),
        }
    }
}
