//! Per-node input queues and the engine wakeup signal.
//!
//! Queue access is linearizable: any thread may append (the router on the
//! engine thread, injectors anywhere), only the engine dequeues. A mutex
//! per queue keeps appends atomic; single-consumer dequeue means a checked
//! head cannot change before it is popped.

use ioa_core::{Message, MessageType};
use ioa_types::{NodeIndex, Sender};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// A queued message with its recorded sender.
#[derive(Debug, Clone)]
pub(crate) struct InboundEnvelope {
    pub message: Message,
    pub sender: Sender,
}

/// The per-node FIFO input queues.
#[derive(Debug)]
pub(crate) struct Inboxes {
    queues: Vec<Mutex<VecDeque<InboundEnvelope>>>,
    capacity: Option<usize>,
}

impl Inboxes {
    pub fn new(nodes: usize, capacity: Option<usize>) -> Self {
        Self {
            queues: (0..nodes).map(|_| Mutex::new(VecDeque::new())).collect(),
            capacity,
        }
    }

    /// Append to a node's queue. `Err(capacity)` when a configured bound
    /// would be exceeded; the envelope is not enqueued.
    pub fn push(&self, node: NodeIndex, envelope: InboundEnvelope) -> Result<(), usize> {
        let mut queue = self.queues[node.as_usize()]
            .lock()
            .expect("inbox mutex poisoned");
        if let Some(capacity) = self.capacity {
            if queue.len() >= capacity {
                return Err(capacity);
            }
        }
        queue.push_back(envelope);
        Ok(())
    }

    /// Message type at the head of a node's queue.
    pub fn head_type(&self, node: NodeIndex) -> Option<MessageType> {
        self.queues[node.as_usize()]
            .lock()
            .expect("inbox mutex poisoned")
            .front()
            .map(|envelope| envelope.message.message_type())
    }

    /// Dequeue the head of a node's queue.
    pub fn pop(&self, node: NodeIndex) -> Option<InboundEnvelope> {
        self.queues[node.as_usize()]
            .lock()
            .expect("inbox mutex poisoned")
            .pop_front()
    }

    #[cfg(test)]
    pub fn len(&self, node: NodeIndex) -> usize {
        self.queues[node.as_usize()]
            .lock()
            .expect("inbox mutex poisoned")
            .len()
    }
}

/// Generation-counted wakeup signal.
///
/// Producers bump after appending (and the stop handle bumps after raising
/// the flag); the engine snapshots before scanning for enabled slots and
/// waits past the snapshot when quiescent. Bump-then-notify under the lock
/// means a wakeup between snapshot and wait is never lost.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    generation: Mutex<u64>,
    condvar: Condvar,
}

impl Signal {
    pub fn snapshot(&self) -> u64 {
        *self.generation.lock().expect("signal mutex poisoned")
    }

    pub fn bump(&self) {
        let mut generation = self.generation.lock().expect("signal mutex poisoned");
        *generation += 1;
        self.condvar.notify_all();
    }

    pub fn wait_past(&self, seen: u64) {
        let mut generation = self.generation.lock().expect("signal mutex poisoned");
        while *generation == seen {
            generation = self
                .condvar
                .wait(generation)
                .expect("signal mutex poisoned");
        }
    }
}
