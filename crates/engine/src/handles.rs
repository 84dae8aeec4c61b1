//! Handles that let the outside world reach a running network.

use crate::mailbox::{Inboxes, InboundEnvelope, Signal};
use ioa_core::{Alphabet, Message, Payload};
use ioa_types::{ExternalUserId, NodeIndex, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Why an injection was refused. The network itself is unaffected; the
/// caller decides whether to retry, drop, or abort.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InjectError {
    #[error("unknown node {node} (network has {nodes} nodes)")]
    UnknownNode { node: NodeIndex, nodes: usize },

    #[error("{message_type} is not an input type of this automaton")]
    NotAnInputType { message_type: &'static str },

    #[error("input queue for {node} is full (capacity {capacity})")]
    QueueFull { node: NodeIndex, capacity: usize },
}

/// Requests a cooperative halt of the run loop.
///
/// The engine observes the request between steps, so the step in flight
/// finishes first. Stopping also wakes an engine that is blocked waiting
/// for work.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    signal: Arc<Signal>,
}

impl StopHandle {
    pub(crate) fn new(flag: Arc<AtomicBool>, signal: Arc<Signal>) -> Self {
        Self { flag, signal }
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
        self.signal.bump();
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Feeds environment messages into node queues while the engine runs.
///
/// Injection appends to the target queue exactly like a routed message,
/// attributed to the node's own external user, and is validated up front:
/// the node must exist and the payload type must be in the input alphabet.
#[derive(Clone)]
pub struct Injector {
    alphabet: Alphabet,
    inboxes: Arc<Inboxes>,
    signal: Arc<Signal>,
    nodes: usize,
}

impl Injector {
    pub(crate) fn new(
        alphabet: Alphabet,
        inboxes: Arc<Inboxes>,
        signal: Arc<Signal>,
        nodes: usize,
    ) -> Self {
        Self { alphabet, inboxes, signal, nodes }
    }

    /// Wrap `payload` and append it to `node`'s queue.
    pub fn inject<M: Payload>(&self, node: NodeIndex, payload: M) -> Result<(), InjectError> {
        self.inject_message(node, Message::new(payload))
    }

    /// Append an already-wrapped message to `node`'s queue.
    pub fn inject_message(&self, node: NodeIndex, message: Message) -> Result<(), InjectError> {
        if node.as_usize() >= self.nodes {
            return Err(InjectError::UnknownNode { node, nodes: self.nodes });
        }
        if !self.alphabet.is_input(message.message_type()) {
            return Err(InjectError::NotAnInputType { message_type: message.type_name() });
        }
        let envelope = InboundEnvelope {
            message,
            sender: Sender::External(ExternalUserId::for_node(node)),
        };
        self.inboxes
            .push(node, envelope)
            .map_err(|capacity| InjectError::QueueFull { node, capacity })?;
        self.signal.bump();
        Ok(())
    }
}
