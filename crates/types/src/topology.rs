//! The underlying communication graph.
//!
//! A directed graph over nodes `0..n`, stored as a square boolean adjacency
//! relation in row-major order. `adj[i][j]` means node `i` may send to node
//! `j`. The graph is built once, validated, and then shared read-only by the
//! engine, the router, and action contexts.

use crate::NodeIndex;
use thiserror::Error;

/// Errors from graph construction.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The supplied adjacency data does not describe a square relation.
    #[error("malformed adjacency: {reason}")]
    MalformedAdjacency { reason: String },
}

/// Immutable directed graph over the automata.
///
/// Self-loops are permitted and meaningful: a node with an edge to itself
/// may send messages to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Number of nodes (rows and columns of the relation).
    nodes: usize,

    /// Row-major adjacency entries, `nodes * nodes` of them.
    adj: Vec<bool>,
}

impl Topology {
    /// Build from a two-dimensional boolean matrix.
    ///
    /// Every row must have exactly as many entries as there are rows.
    pub fn from_matrix(rows: &[Vec<bool>]) -> Result<Self, TopologyError> {
        let nodes = rows.len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != nodes {
                return Err(TopologyError::MalformedAdjacency {
                    reason: format!(
                        "row {} has {} entries, expected {} for a square relation",
                        i,
                        row.len(),
                        nodes
                    ),
                });
            }
        }

        let adj = rows.iter().flatten().copied().collect();
        Ok(Self { nodes, adj })
    }

    /// Build from a flattened row-major boolean vector plus a column count.
    ///
    /// The length must be a multiple of `cols`, and the implied row count
    /// must equal `cols`.
    pub fn from_flat(entries: Vec<bool>, cols: usize) -> Result<Self, TopologyError> {
        if cols == 0 {
            if entries.is_empty() {
                return Ok(Self {
                    nodes: 0,
                    adj: Vec::new(),
                });
            }
            return Err(TopologyError::MalformedAdjacency {
                reason: format!("{} entries with zero columns", entries.len()),
            });
        }

        if entries.len() % cols != 0 {
            return Err(TopologyError::MalformedAdjacency {
                reason: format!(
                    "flattened length {} is not a multiple of {} columns",
                    entries.len(),
                    cols
                ),
            });
        }

        let rows = entries.len() / cols;
        if rows != cols {
            return Err(TopologyError::MalformedAdjacency {
                reason: format!("{rows} rows for {cols} columns, expected a square relation"),
            });
        }

        Ok(Self {
            nodes: cols,
            adj: entries,
        })
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes
    }

    /// Whether `node` is a valid index into this graph.
    pub fn contains(&self, node: NodeIndex) -> bool {
        node.as_usize() < self.nodes
    }

    /// Whether an edge `from -> to` exists.
    ///
    /// Out-of-range indices simply have no edges.
    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        let (i, j) = (from.as_usize(), to.as_usize());
        if i >= self.nodes || j >= self.nodes {
            return false;
        }
        self.adj[i * self.nodes + j]
    }

    /// Out-neighbors of a node, in ascending index order.
    ///
    /// Derived from the adjacency row on each call; never cached.
    pub fn neighbors(&self, of: NodeIndex) -> Vec<NodeIndex> {
        let i = of.as_usize();
        if i >= self.nodes {
            return Vec::new();
        }
        self.adj[i * self.nodes..(i + 1) * self.nodes]
            .iter()
            .enumerate()
            .filter(|(_, &edge)| edge)
            .map(|(j, _)| NodeIndex(j as u32))
            .collect()
    }
}
