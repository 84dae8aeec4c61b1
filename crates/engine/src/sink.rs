//! External sinks: where messages addressed to external users go.

use ioa_core::Message;
use ioa_types::{ExternalUserId, NodeIndex};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A message leaving the network for an external user.
#[derive(Debug, Clone)]
pub struct ExternalDelivery {
    /// Node whose output action emitted the message.
    pub from: NodeIndex,

    /// External user addressed.
    pub user: ExternalUserId,

    /// The message value.
    pub message: Message,
}

/// Consumer for messages addressed to one external user.
///
/// Delivery is a one-shot handoff with no queueing in the engine: `deliver`
/// is called once per message and is expected to consume immediately. A
/// sink that cannot should buffer on its own side, as [`ExternalMailbox`]
/// does.
pub trait ExternalSink: Send {
    fn deliver(&mut self, delivery: ExternalDelivery);
}

impl<F: FnMut(ExternalDelivery) + Send> ExternalSink for F {
    fn deliver(&mut self, delivery: ExternalDelivery) {
        self(delivery);
    }
}

/// Buffering sink collaborator.
///
/// Register a clone as the sink and drain from any other clone whenever
/// convenient; all clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct ExternalMailbox {
    buffer: Arc<Mutex<VecDeque<ExternalDelivery>>>,
}

impl ExternalMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the oldest buffered delivery.
    pub fn try_recv(&self) -> Option<ExternalDelivery> {
        self.buffer
            .lock()
            .expect("mailbox mutex poisoned")
            .pop_front()
    }

    /// Drain everything buffered so far, oldest first.
    pub fn drain(&self) -> Vec<ExternalDelivery> {
        self.buffer
            .lock()
            .expect("mailbox mutex poisoned")
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().expect("mailbox mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExternalSink for ExternalMailbox {
    fn deliver(&mut self, delivery: ExternalDelivery) {
        self.buffer
            .lock()
            .expect("mailbox mutex poisoned")
            .push_back(delivery);
    }
}
