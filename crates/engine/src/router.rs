//! Routing of fired outboxes to queues and external sinks.

use crate::error::EngineError;
use crate::mailbox::{Inboxes, InboundEnvelope};
use crate::sink::{ExternalDelivery, ExternalSink};
use ioa_core::Outbox;
use ioa_types::{Destination, ExternalUserId, NodeIndex, Sender, Topology};
use std::sync::Arc;
use tracing::{debug, warn};

/// Delivers outbox entries, enforcing destination legality.
///
/// Entry order and per-entry destination order are preserved, which is what
/// makes delivery FIFO per source-destination edge. Counters feed the run
/// report.
pub(crate) struct Router {
    topology: Arc<Topology>,
    sinks: Vec<Option<Box<dyn ExternalSink>>>,
    delivered: u64,
    external_delivered: u64,
    external_dropped: u64,
}

impl Router {
    pub fn new(topology: Arc<Topology>) -> Self {
        let nodes = topology.node_count();
        Self {
            topology,
            sinks: (0..nodes).map(|_| None).collect(),
            delivered: 0,
            external_delivered: 0,
            external_dropped: 0,
        }
    }

    /// Register the sink for a node's associated external user, replacing
    /// any previous one.
    pub fn register_sink(&mut self, node: NodeIndex, sink: Box<dyn ExternalSink>) {
        if self.sinks[node.as_usize()].replace(sink).is_some() {
            debug!(node = node.0, "external sink replaced");
        }
    }

    /// Route everything one output-action firing produced.
    ///
    /// Every destination must be an out-neighbor of `from` or `from`'s own
    /// external user; anything else is fatal. Queue appends respect the
    /// configured bound; external handoff is one-shot, with a counted,
    /// logged drop when no sink is registered.
    pub fn dispatch(
        &mut self,
        from: NodeIndex,
        action: &'static str,
        outbox: Outbox,
        inboxes: &Inboxes,
    ) -> Result<(), EngineError> {
        let own_user = ExternalUserId::for_node(from);

        for envelope in outbox.into_entries() {
            for &destination in &envelope.to {
                match destination {
                    Destination::Node(to) => {
                        if !self.topology.has_edge(from, to) {
                            return Err(EngineError::IllegalDestination {
                                node: from,
                                action,
                                destination,
                            });
                        }
                        let inbound = InboundEnvelope {
                            message: envelope.message.clone(),
                            sender: Sender::Node(from),
                        };
                        inboxes
                            .push(to, inbound)
                            .map_err(|capacity| EngineError::QueueOverflow { node: to, capacity })?;
                        self.delivered += 1;
                    }
                    Destination::External(user) => {
                        if user != own_user {
                            return Err(EngineError::IllegalDestination {
                                node: from,
                                action,
                                destination,
                            });
                        }
                        let delivery = ExternalDelivery {
                            from,
                            user,
                            message: envelope.message.clone(),
                        };
                        match &mut self.sinks[from.as_usize()] {
                            Some(sink) => {
                                sink.deliver(delivery);
                                self.external_delivered += 1;
                            }
                            None => {
                                warn!(
                                    node = from.0,
                                    action,
                                    message = envelope.message.type_name(),
                                    "external delivery dropped: no sink registered"
                                );
                                self.external_dropped += 1;
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn external_delivered(&self) -> u64 {
        self.external_delivered
    }

    pub fn external_dropped(&self) -> u64 {
        self.external_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ExternalMailbox;

    #[derive(Debug)]
    struct Hello;

    fn pair() -> Arc<Topology> {
        // 0 -> 1 only.
        Arc::new(Topology::from_matrix(&[vec![false, true], vec![false, false]]).unwrap())
    }

    #[test]
    fn test_delivers_to_neighbor_queue() {
        let topology = pair();
        let mut router = Router::new(Arc::clone(&topology));
        let inboxes = Inboxes::new(2, None);

        let outbox = Outbox::single(Hello, NodeIndex(1));
        router
            .dispatch(NodeIndex(0), "greet", outbox, &inboxes)
            .unwrap();

        assert_eq!(router.delivered(), 1);
        let envelope = inboxes.pop(NodeIndex(1)).unwrap();
        assert!(envelope.message.is::<Hello>());
        assert_eq!(envelope.sender, Sender::Node(NodeIndex(0)));
    }

    #[test]
    fn test_non_neighbor_is_illegal() {
        let topology = pair();
        let mut router = Router::new(Arc::clone(&topology));
        let inboxes = Inboxes::new(2, None);

        // 1 has no edge back to 0.
        let outbox = Outbox::single(Hello, NodeIndex(0));
        let err = router
            .dispatch(NodeIndex(1), "greet", outbox, &inboxes)
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::IllegalDestination {
                node: NodeIndex(1),
                action: "greet",
                destination: Destination::Node(NodeIndex(0)),
            }
        ));
    }

    #[test]
    fn test_foreign_external_user_is_illegal() {
        let topology = pair();
        let mut router = Router::new(Arc::clone(&topology));
        let inboxes = Inboxes::new(2, None);

        let outbox = Outbox::single(Hello, ExternalUserId(1));
        let err = router
            .dispatch(NodeIndex(0), "announce", outbox, &inboxes)
            .unwrap_err();

        assert!(matches!(err, EngineError::IllegalDestination { .. }));
    }

    #[test]
    fn test_external_handoff_and_drop() {
        let topology = pair();
        let mut router = Router::new(Arc::clone(&topology));
        let inboxes = Inboxes::new(2, None);
        let mailbox = ExternalMailbox::new();
        router.register_sink(NodeIndex(0), Box::new(mailbox.clone()));

        let outbox = Outbox::single(Hello, ExternalUserId(0));
        router
            .dispatch(NodeIndex(0), "announce", outbox, &inboxes)
            .unwrap();
        assert_eq!(mailbox.len(), 1);
        assert_eq!(router.external_delivered(), 1);

        // Node 1 has no sink: counted drop, not an error.
        let outbox = Outbox::single(Hello, ExternalUserId(1));
        router
            .dispatch(NodeIndex(1), "announce", outbox, &inboxes)
            .unwrap();
        assert_eq!(router.external_dropped(), 1);
    }

    #[test]
    fn test_queue_bound_is_fatal() {
        let topology = pair();
        let mut router = Router::new(Arc::clone(&topology));
        let inboxes = Inboxes::new(2, Some(1));

        let mut outbox = Outbox::new();
        outbox.push(Hello, NodeIndex(1));
        outbox.push(Hello, NodeIndex(1));
        let err = router
            .dispatch(NodeIndex(0), "flood", outbox, &inboxes)
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::QueueOverflow {
                node: NodeIndex(1),
                capacity: 1,
            }
        ));
    }
}
