//! Message routing between node tasks.
//!
//! A single router task owns the wiring graph, the per-node senders, and
//! the external sinks. Node tasks hand it fired outboxes over an
//! unbounded channel; it fans each entry out to the destination queues,
//! enforcing the same destination rules as the deterministic engine.

use crate::runtime::ParallelError;
use ioa_core::Message;
use ioa_engine::{ExternalDelivery, ExternalSink};
use ioa_types::{Destination, ExternalUserId, NodeIndex, Sender, Topology};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Handle for sending fired outbox entries to the router (unbounded).
pub(crate) type RouterTx = mpsc::UnboundedSender<RoutedEnvelope>;

/// Handle for receiving messages at a node task (unbounded).
pub(crate) type NodeRx = mpsc::UnboundedReceiver<NodeInbound>;

/// One outbox entry with its provenance, sent to the router.
pub(crate) struct RoutedEnvelope {
    pub from: NodeIndex,
    /// Output action that fired, for error reporting.
    pub action: &'static str,
    pub message: Message,
    pub to: Vec<Destination>,
}

/// Inbound message delivered to a node task.
#[derive(Clone)]
pub(crate) struct NodeInbound {
    pub message: Message,
    pub sender: Sender,
}

/// Counters snapshotted from the router after its task completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterStats {
    /// Messages appended to node queues.
    pub delivered: u64,
    /// Messages handed to external sinks.
    pub external_delivered: u64,
    /// External deliveries dropped for want of a sink.
    pub external_dropped: u64,
}

/// Routes messages between node tasks.
///
/// Uses unbounded channels: in-process queues have no backpressure
/// story that would not just move the stall elsewhere, and the
/// deterministic engine exists for bounded-queue semantics.
pub(crate) struct MessageRouter {
    topology: Arc<Topology>,
    node_senders: Vec<mpsc::UnboundedSender<NodeInbound>>,
    sinks: Vec<Option<Box<dyn ExternalSink>>>,
    delivered: Arc<AtomicU64>,
    external_delivered: Arc<AtomicU64>,
    external_dropped: Arc<AtomicU64>,
}

impl MessageRouter {
    pub fn new(
        topology: Arc<Topology>,
        node_senders: Vec<mpsc::UnboundedSender<NodeInbound>>,
        sinks: Vec<Option<Box<dyn ExternalSink>>>,
    ) -> Self {
        Self {
            topology,
            node_senders,
            sinks,
            delivered: Arc::new(AtomicU64::new(0)),
            external_delivered: Arc::new(AtomicU64::new(0)),
            external_dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A handle for reading stats after the router task is spawned.
    pub fn stats_handle(&self) -> RouterStatsHandle {
        RouterStatsHandle {
            delivered: Arc::clone(&self.delivered),
            external_delivered: Arc::clone(&self.external_delivered),
            external_dropped: Arc::clone(&self.external_dropped),
        }
    }

    /// Run the router's main loop.
    ///
    /// Exits cleanly when every sender is dropped, or with the first
    /// routing violation, leaving later queued messages unrouted.
    pub async fn run(
        mut self,
        mut incoming: mpsc::UnboundedReceiver<RoutedEnvelope>,
    ) -> Result<(), ParallelError> {
        while let Some(envelope) = incoming.recv().await {
            self.route(envelope)?;
        }
        debug!("router shutdown complete");
        Ok(())
    }

    fn route(&mut self, envelope: RoutedEnvelope) -> Result<(), ParallelError> {
        let own_user = ExternalUserId::for_node(envelope.from);

        for &destination in &envelope.to {
            match destination {
                Destination::Node(to) => {
                    if !self.topology.has_edge(envelope.from, to) {
                        return Err(ParallelError::IllegalDestination {
                            node: envelope.from,
                            action: envelope.action,
                            destination,
                        });
                    }
                    let inbound = NodeInbound {
                        message: envelope.message.clone(),
                        sender: Sender::Node(envelope.from),
                    };
                    if let Some(tx) = self.node_senders.get(to.as_usize()) {
                        // A closed receiver means that node already shut down.
                        let _ = tx.send(inbound);
                    }
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Destination::External(user) => {
                    if user != own_user {
                        return Err(ParallelError::IllegalDestination {
                            node: envelope.from,
                            action: envelope.action,
                            destination,
                        });
                    }
                    let delivery = ExternalDelivery {
                        from: envelope.from,
                        user,
                        message: envelope.message.clone(),
                    };
                    match self.sinks.get_mut(envelope.from.as_usize()).and_then(Option::as_mut) {
                        Some(sink) => {
                            sink.deliver(delivery);
                            self.external_delivered.fetch_add(1, Ordering::Relaxed);
                        }
                        None => {
                            warn!(
                                node = envelope.from.0,
                                action = envelope.action,
                                message = envelope.message.type_name(),
                                "external delivery dropped: no sink registered"
                            );
                            self.external_dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Reads router counters while or after the router task runs.
///
/// The router is consumed by [`MessageRouter::run`], so live access
/// goes through these shared atomics.
#[derive(Clone)]
pub struct RouterStatsHandle {
    delivered: Arc<AtomicU64>,
    external_delivered: Arc<AtomicU64>,
    external_dropped: Arc<AtomicU64>,
}

impl RouterStatsHandle {
    pub fn snapshot(&self) -> RouterStats {
        RouterStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            external_delivered: self.external_delivered.load(Ordering::Relaxed),
            external_dropped: self.external_dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug)]
    struct Hello;

    fn pair() -> Arc<Topology> {
        // 0 -> 1 only.
        Arc::new(Topology::from_matrix(&[vec![false, true], vec![false, false]]).unwrap())
    }

    fn channels(nodes: usize) -> (Vec<mpsc::UnboundedSender<NodeInbound>>, Vec<NodeRx>) {
        (0..nodes).map(|_| mpsc::unbounded_channel()).unzip()
    }

    #[tokio::test]
    async fn test_router_shuts_down_when_senders_drop() {
        let (senders, _receivers) = channels(2);
        let router = MessageRouter::new(pair(), senders, vec![None, None]);
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(router.run(rx));
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("router should shut down")
            .expect("router task should complete")
            .expect("router should exit cleanly");
    }

    #[tokio::test]
    async fn test_router_delivers_along_edges() {
        let (senders, mut receivers) = channels(2);
        let router = MessageRouter::new(pair(), senders, vec![None, None]);
        let stats = router.stats_handle();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(router.run(rx));

        tx.send(RoutedEnvelope {
            from: NodeIndex(0),
            action: "greet",
            message: Message::new(Hello),
            to: vec![Destination::Node(NodeIndex(1))],
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap().unwrap();

        let inbound = receivers[1].try_recv().unwrap();
        assert!(inbound.message.is::<Hello>());
        assert_eq!(inbound.sender, Sender::Node(NodeIndex(0)));
        assert_eq!(stats.snapshot().delivered, 1);
    }

    #[tokio::test]
    async fn test_router_rejects_non_neighbor_destinations() {
        let (senders, _receivers) = channels(2);
        let router = MessageRouter::new(pair(), senders, vec![None, None]);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(router.run(rx));

        // 1 has no edge back to 0.
        tx.send(RoutedEnvelope {
            from: NodeIndex(1),
            action: "greet",
            message: Message::new(Hello),
            to: vec![Destination::Node(NodeIndex(0))],
        })
        .unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            ParallelError::IllegalDestination { node: NodeIndex(1), action: "greet", .. }
        ));
        drop(tx);
    }
}
