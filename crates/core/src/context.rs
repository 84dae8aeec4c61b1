//! Per-invocation action context.

use ioa_types::{ExternalUserId, NodeIndex, Sender, Topology};
use std::fmt;
use thiserror::Error;

/// The three action families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCategory {
    /// Delivers one queued message.
    Input,
    /// Emits messages when its predicate holds.
    Output,
    /// Steps local state when its predicate holds.
    Internal,
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionCategory::Input => f.write_str("input"),
            ActionCategory::Output => f.write_str("output"),
            ActionCategory::Internal => f.write_str("internal"),
        }
    }
}

/// Errors from context queries.
#[derive(Debug, Error)]
pub enum ContextError {
    /// `sender()` outside an input invocation.
    #[error("sender is not available in {category} actions")]
    SenderUnavailable {
        /// Category of the invocation that asked.
        category: ActionCategory,
    },
}

/// Read-only view handed to each action invocation.
///
/// Built fresh per invocation, passed explicitly as a parameter, and
/// discarded when the invocation returns. Never stored by the engine,
/// never shared between invocations.
pub struct ActionContext<'a> {
    topology: &'a Topology,
    node: NodeIndex,
    external_user: ExternalUserId,
    category: ActionCategory,
    sender: Option<Sender>,
}

impl<'a> ActionContext<'a> {
    /// Context for delivering one input message, carrying its sender.
    pub fn for_input(
        topology: &'a Topology,
        node: NodeIndex,
        external_user: ExternalUserId,
        sender: Sender,
    ) -> Self {
        Self {
            topology,
            node,
            external_user,
            category: ActionCategory::Input,
            sender: Some(sender),
        }
    }

    /// Context for an output predicate or effect.
    pub fn for_output(
        topology: &'a Topology,
        node: NodeIndex,
        external_user: ExternalUserId,
    ) -> Self {
        Self {
            topology,
            node,
            external_user,
            category: ActionCategory::Output,
            sender: None,
        }
    }

    /// Context for an internal predicate or effect.
    pub fn for_internal(
        topology: &'a Topology,
        node: NodeIndex,
        external_user: ExternalUserId,
    ) -> Self {
        Self {
            topology,
            node,
            external_user,
            category: ActionCategory::Internal,
            sender: None,
        }
    }

    /// Out-neighbors of the executing node, recomputed from the graph row.
    pub fn neighbors(&self) -> Vec<NodeIndex> {
        self.topology.neighbors(self.node)
    }

    /// Number of nodes in the network.
    pub fn node_count(&self) -> usize {
        self.topology.node_count()
    }

    /// Index of the executing node.
    pub fn self_index(&self) -> NodeIndex {
        self.node
    }

    /// The external user this node may address.
    pub fn external_user(&self) -> ExternalUserId {
        self.external_user
    }

    /// Sender of the message being delivered.
    ///
    /// Only input invocations have one; elsewhere this is
    /// [`ContextError::SenderUnavailable`].
    pub fn sender(&self) -> Result<Sender, ContextError> {
        self.sender.ok_or(ContextError::SenderUnavailable {
            category: self.category,
        })
    }

    /// Category of the current invocation.
    pub fn category(&self) -> ActionCategory {
        self.category
    }
}
