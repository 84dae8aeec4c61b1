//! Parallel runtime orchestrator.
//!
//! Manages the lifecycle of a concurrent run:
//! 1. Builds per-node channels up front, so injection works before start
//! 2. Spawns the router task and one task per node
//! 3. Accepts injections and serves live router stats while running
//! 4. Coordinates shutdown and folds node summaries into a report

use crate::node_task::{NodeSummary, NodeTask};
use crate::router::{MessageRouter, NodeInbound, NodeRx, RouterStats, RouterStatsHandle, RouterTx};
use ioa_core::{Message, Payload, Signature, State};
use ioa_engine::{ExternalSink, HaltReason, InjectError, RunReport};
use ioa_types::{Destination, ExternalUserId, NodeIndex, Sender, Topology};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Failures of the concurrent runtime.
///
/// The routing violations carry the same meaning as their deterministic
/// counterparts; here they surface from [`ParallelEngine::shutdown`]
/// rather than mid-run, because the tasks that hit them outlive the
/// caller's stack.
#[derive(Debug, Error)]
pub enum ParallelError {
    #[error("network already started")]
    AlreadyStarted,

    #[error("network not started")]
    NotStarted,

    #[error("output action '{action}' of {node} addressed {destination}, which is neither a neighbor nor the node's external user")]
    IllegalDestination {
        node: NodeIndex,
        action: &'static str,
        destination: Destination,
    },

    #[error("output action '{action}' of {node} emitted {message_type}, which it does not declare")]
    UndeclaredEmission {
        node: NodeIndex,
        action: &'static str,
        message_type: &'static str,
    },

    #[error("node task failed: {0}")]
    TaskFailed(String),
}

/// Runs one automaton per topology node, each on its own tokio task.
///
/// Scheduling across nodes is left to the runtime, so interleavings vary
/// between runs; use the deterministic engine when reproducibility
/// matters. Every per-node rule still holds: FIFO queues, alphabet
/// checks on injection, destination and emission checks on firing.
pub struct ParallelEngine<S: State> {
    signature: Arc<Signature<S>>,
    topology: Arc<Topology>,
    node_senders: Vec<mpsc::UnboundedSender<NodeInbound>>,
    node_receivers: Vec<Option<NodeRx>>,
    sinks: Vec<Option<Box<dyn ExternalSink>>>,
    shutdown: watch::Sender<bool>,
    router_tx: Option<RouterTx>,
    router_handle: Option<JoinHandle<Result<(), ParallelError>>>,
    task_handles: Vec<JoinHandle<Result<NodeSummary, ParallelError>>>,
    stats: Option<RouterStatsHandle>,
    started: bool,
}

impl<S: State> ParallelEngine<S> {
    /// Instantiate `signature` at every node of `topology`.
    pub fn new(signature: Signature<S>, topology: Topology) -> Self {
        let nodes = topology.node_count();
        info!(
            nodes,
            inputs = signature.input_actions().len(),
            outputs = signature.output_actions().len(),
            internals = signature.internal_actions().len(),
            "parallel network configured"
        );

        let (node_senders, node_receivers): (Vec<_>, Vec<_>) =
            (0..nodes).map(|_| mpsc::unbounded_channel()).unzip();
        let (shutdown, _) = watch::channel(false);

        Self {
            signature: Arc::new(signature),
            topology: Arc::new(topology),
            node_senders,
            node_receivers: node_receivers.into_iter().map(Some).collect(),
            sinks: (0..nodes).map(|_| None).collect(),
            shutdown,
            router_tx: None,
            router_handle: None,
            task_handles: Vec::new(),
            stats: None,
            started: false,
        }
    }

    /// Attach the sink that receives `node`'s external deliveries.
    ///
    /// Must happen before [`start`](Self::start); the sinks move into the
    /// router task. Panics if `node` is outside the network.
    pub fn register_sink(&mut self, node: NodeIndex, sink: impl ExternalSink + 'static) {
        if self.started {
            warn!(node = node.0, "sink registered after start is ignored");
            return;
        }
        self.sinks[node.as_usize()] = Some(Box::new(sink));
    }

    /// Spawn the router task and one task per node.
    pub async fn start(&mut self) -> Result<(), ParallelError> {
        if self.started {
            return Err(ParallelError::AlreadyStarted);
        }
        let nodes = self.node_senders.len();
        info!(nodes, "starting parallel network");

        let (router_tx, router_rx) = mpsc::unbounded_channel();
        let router = MessageRouter::new(
            Arc::clone(&self.topology),
            self.node_senders.clone(),
            std::mem::take(&mut self.sinks),
        );
        self.stats = Some(router.stats_handle());
        self.router_handle = Some(tokio::spawn(router.run(router_rx)));

        for (index, slot) in self.node_receivers.iter_mut().enumerate() {
            let Some(inbox) = slot.take() else {
                return Err(ParallelError::AlreadyStarted);
            };
            let task = NodeTask::new(
                NodeIndex(index as u32),
                Arc::clone(&self.signature),
                Arc::clone(&self.topology),
                inbox,
                router_tx.clone(),
                self.shutdown.subscribe(),
            );
            self.task_handles.push(tokio::spawn(task.run()));
        }

        self.router_tx = Some(router_tx);
        self.started = true;
        info!(nodes, "all node tasks spawned");
        Ok(())
    }

    /// Wrap `payload` and append it to `node`'s queue.
    ///
    /// Works before and during a run; queues are unbounded here, so
    /// injection never reports a full queue.
    pub fn inject<M: Payload>(&self, node: NodeIndex, payload: M) -> Result<(), InjectError> {
        self.inject_message(node, Message::new(payload))
    }

    pub fn inject_message(&self, node: NodeIndex, message: Message) -> Result<(), InjectError> {
        let Some(tx) = self.node_senders.get(node.as_usize()) else {
            return Err(InjectError::UnknownNode {
                node,
                nodes: self.node_senders.len(),
            });
        };
        if !self.signature.alphabet().is_input(message.message_type()) {
            return Err(InjectError::NotAnInputType {
                message_type: message.type_name(),
            });
        }
        let envelope = NodeInbound {
            message,
            sender: Sender::External(ExternalUserId::for_node(node)),
        };
        // A closed receiver means that node already shut down.
        let _ = tx.send(envelope);
        Ok(())
    }

    /// Live router counters.
    pub fn stats(&self) -> RouterStats {
        self.stats
            .as_ref()
            .map(|handle| handle.snapshot())
            .unwrap_or_default()
    }

    /// Stop every task and fold their summaries into a report.
    ///
    /// The first fatal violation any task hit is returned instead of a
    /// report; the run's counters are unrecoverable in that case.
    pub async fn shutdown(mut self) -> Result<RunReport, ParallelError> {
        if !self.started {
            return Err(ParallelError::NotStarted);
        }
        info!("stopping parallel network");
        let _ = self.shutdown.send(true);

        let mut steps = 0;
        let mut fired: HashMap<(NodeIndex, &'static str), u64> = HashMap::new();
        let mut first_failure = None;

        for handle in self.task_handles.drain(..) {
            match handle.await {
                Ok(Ok(summary)) => {
                    let node = summary.node;
                    steps += summary.steps;
                    for (name, count) in summary.fired {
                        *fired.entry((node, name)).or_insert(0) += count;
                    }
                }
                Ok(Err(err)) => {
                    first_failure.get_or_insert(err);
                }
                Err(err) => {
                    first_failure.get_or_insert(ParallelError::TaskFailed(err.to_string()));
                }
            }
        }

        // With every node sender gone the router drains and exits.
        drop(self.router_tx.take());
        if let Some(handle) = self.router_handle.take() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    first_failure.get_or_insert(err);
                }
                Err(err) => {
                    first_failure.get_or_insert(ParallelError::TaskFailed(err.to_string()));
                }
            }
        }

        if let Some(err) = first_failure {
            return Err(err);
        }

        let stats = self
            .stats
            .take()
            .map(|handle| handle.snapshot())
            .unwrap_or_default();

        let report = RunReport {
            steps,
            fired,
            delivered: stats.delivered,
            external_delivered: stats.external_delivered,
            external_dropped: stats.external_dropped,
            halt: HaltReason::StopRequested,
        };
        info!(steps = report.steps, delivered = report.delivered, "parallel network stopped");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioa_core::{Alphabet, InputAction};

    #[derive(Debug)]
    struct Note(u32);
    #[derive(Debug)]
    struct Unlisted;

    #[derive(Debug, Default)]
    struct Pad {
        notes: Vec<u32>,
    }

    fn pad_signature() -> Signature<Pad> {
        let alphabet = Alphabet::builder().input::<Note>().output::<Note>().build();
        Signature::build(
            alphabet,
            vec![InputAction::new("jot", |_, state: &mut Pad, note: &Note| {
                state.notes.push(note.0);
            })],
            Vec::new(),
            Vec::new(),
        )
        .unwrap()
    }

    fn duo() -> Topology {
        Topology::from_matrix(&[vec![false, true], vec![true, false]]).unwrap()
    }

    #[tokio::test]
    async fn test_engine_starts_once() {
        let mut engine = ParallelEngine::new(pad_signature(), duo());
        engine.start().await.unwrap();
        assert!(matches!(
            engine.start().await,
            Err(ParallelError::AlreadyStarted)
        ));
        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_requires_start() {
        let engine = ParallelEngine::new(pad_signature(), duo());
        assert!(matches!(
            engine.shutdown().await,
            Err(ParallelError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn test_idle_network_stops_cleanly() {
        let mut engine = ParallelEngine::new(pad_signature(), duo());
        engine.start().await.unwrap();
        let report = engine.shutdown().await.unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(report.delivered, 0);
        assert_eq!(report.halt, HaltReason::StopRequested);
    }

    #[tokio::test]
    async fn test_injection_is_validated() {
        let engine = ParallelEngine::new(pad_signature(), duo());
        assert!(matches!(
            engine.inject(NodeIndex(9), Note(1)),
            Err(InjectError::UnknownNode { .. })
        ));
        assert!(matches!(
            engine.inject(NodeIndex(0), Unlisted),
            Err(InjectError::NotAnInputType { .. })
        ));
    }

    #[tokio::test]
    async fn test_injection_before_start_is_processed() {
        let mut engine = ParallelEngine::new(pad_signature(), duo());
        engine.inject(NodeIndex(0), Note(3)).unwrap();
        engine.start().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let report = engine.shutdown().await.unwrap();
        assert_eq!(report.steps, 1);
        assert_eq!(report.fired_by(NodeIndex(0), "jot"), 1);
    }
}
