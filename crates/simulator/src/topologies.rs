//! Communication graph shapes for scenarios.
//!
//! Pure suppliers of adjacency data; all validation stays in
//! [`Topology::from_matrix`].

use ioa_types::{Topology, TopologyError};

/// Shape of the communication graph a scenario runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyShape {
    /// Every ordered pair of distinct nodes is an edge.
    Complete,

    /// Each node reaches only its clockwise successor.
    Ring,

    /// Adjacent indices are connected in both directions.
    Line,
}

impl TopologyShape {
    /// Build the graph of this shape over `nodes` nodes.
    pub fn build(self, nodes: usize) -> Result<Topology, TopologyError> {
        match self {
            TopologyShape::Complete => complete(nodes),
            TopologyShape::Ring => ring(nodes),
            TopologyShape::Line => line(nodes),
        }
    }
}

/// Complete directed graph: `i -> j` for every `i != j`.
pub fn complete(nodes: usize) -> Result<Topology, TopologyError> {
    matrix(nodes, |i, j| i != j)
}

/// Unidirectional ring: `i -> (i + 1) mod n`.
///
/// A ring of one node has no edges rather than a self-loop.
pub fn ring(nodes: usize) -> Result<Topology, TopologyError> {
    matrix(nodes, |i, j| nodes > 1 && j == (i + 1) % nodes)
}

/// Bidirectional line: `i <-> i + 1`.
pub fn line(nodes: usize) -> Result<Topology, TopologyError> {
    matrix(nodes, |i, j| i + 1 == j || j + 1 == i)
}

fn matrix(nodes: usize, edge: impl Fn(usize, usize) -> bool) -> Result<Topology, TopologyError> {
    let rows: Vec<Vec<bool>> = (0..nodes)
        .map(|i| (0..nodes).map(|j| edge(i, j)).collect())
        .collect();
    Topology::from_matrix(&rows)
}
