//! One tokio task per node.
//!
//! A task owns its node's state and pending-message queue. It fires its
//! locally enabled actions in scan order, batching steps so an automaton
//! with an always-enabled action still yields to the runtime, and parks
//! on its inbox when locally quiescent. Interleaving across nodes is
//! whatever the tokio scheduler produces; per-node semantics are the
//! same as the deterministic engine's.

use crate::router::{NodeInbound, NodeRx, RoutedEnvelope, RouterTx};
use crate::runtime::ParallelError;
use ioa_core::{ActionContext, OutputAction, Signature, State};
use ioa_types::{ExternalUserId, NodeIndex, Topology};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Steps fired between checks of the inbox and the shutdown flag.
const STEP_BATCH: u32 = 256;

/// What one node did, reported when its task stops.
pub(crate) struct NodeSummary {
    pub node: NodeIndex,
    pub steps: u64,
    pub fired: HashMap<&'static str, u64>,
}

pub(crate) struct NodeTask<S: State> {
    node: NodeIndex,
    signature: Arc<Signature<S>>,
    topology: Arc<Topology>,
    state: S,
    pending: VecDeque<NodeInbound>,
    inbox: NodeRx,
    router_tx: RouterTx,
    shutdown: watch::Receiver<bool>,
    steps: u64,
    fired: HashMap<&'static str, u64>,
}

impl<S: State> NodeTask<S> {
    pub fn new(
        node: NodeIndex,
        signature: Arc<Signature<S>>,
        topology: Arc<Topology>,
        inbox: NodeRx,
        router_tx: RouterTx,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            node,
            signature,
            topology,
            state: S::default(),
            pending: VecDeque::new(),
            inbox,
            router_tx,
            shutdown,
            steps: 0,
            fired: HashMap::new(),
        }
    }

    pub async fn run(mut self) -> Result<NodeSummary, ParallelError> {
        debug!(node = self.node.0, "node task started");
        loop {
            if self.fire_batch(STEP_BATCH)? {
                // Locally quiescent: park until a message or a shutdown.
                tokio::select! {
                    changed = self.shutdown.changed() => {
                        if changed.is_err() || *self.shutdown.borrow() {
                            break;
                        }
                    }
                    inbound = self.inbox.recv() => match inbound {
                        Some(envelope) => self.pending.push_back(envelope),
                        None => break,
                    },
                }
            } else {
                // Batch exhausted with work remaining: drain the inbox and
                // give the scheduler a turn before continuing.
                if *self.shutdown.borrow() {
                    break;
                }
                while let Ok(envelope) = self.inbox.try_recv() {
                    self.pending.push_back(envelope);
                }
                tokio::task::yield_now().await;
            }
        }
        debug!(node = self.node.0, steps = self.steps, "node task stopped");
        Ok(NodeSummary {
            node: self.node,
            steps: self.steps,
            fired: self.fired,
        })
    }

    /// Fire up to `limit` steps in repeated scan passes over the node's
    /// actions. `Ok(true)` means nothing is enabled locally.
    fn fire_batch(&mut self, limit: u32) -> Result<bool, ParallelError> {
        let signature = Arc::clone(&self.signature);
        let user = ExternalUserId::for_node(self.node);
        let mut budget = limit;

        loop {
            let mut progressed = false;

            // Only a head some input action binds is deliverable; an
            // unbound head leaves the queue waiting.
            if self.head_is_bound(&signature) {
                if let Some(envelope) = self.pending.pop_front() {
                    self.deliver(&signature, user, envelope);
                    progressed = true;
                    budget -= 1;
                    if budget == 0 {
                        return Ok(false);
                    }
                }
            }

            for action in signature.output_actions() {
                let enabled = {
                    let ctx = ActionContext::for_output(&self.topology, self.node, user);
                    action.enabled(&ctx, &self.state)
                };
                if enabled {
                    self.fire_output(action, user)?;
                    progressed = true;
                    budget -= 1;
                    if budget == 0 {
                        return Ok(false);
                    }
                }
            }

            for action in signature.internal_actions() {
                let enabled = {
                    let ctx = ActionContext::for_internal(&self.topology, self.node, user);
                    action.enabled(&ctx, &self.state)
                };
                if enabled {
                    let ctx = ActionContext::for_internal(&self.topology, self.node, user);
                    action.fire(&ctx, &mut self.state);
                    self.steps += 1;
                    self.record(action.name());
                    progressed = true;
                    budget -= 1;
                    if budget == 0 {
                        return Ok(false);
                    }
                }
            }

            if !progressed {
                return Ok(true);
            }
        }
    }

    fn head_is_bound(&self, signature: &Signature<S>) -> bool {
        self.pending.front().is_some_and(|envelope| {
            let ty = envelope.message.message_type();
            signature.input_actions().iter().any(|a| a.binds() == ty)
        })
    }

    fn deliver(&mut self, signature: &Signature<S>, user: ExternalUserId, envelope: NodeInbound) {
        self.steps += 1;
        let ty = envelope.message.message_type();
        let action = signature
            .input_actions()
            .iter()
            .find(|a| a.binds() == ty)
            .expect("delivered a head no action binds");
        let ctx = ActionContext::for_input(&self.topology, self.node, user, envelope.sender);
        action.deliver(&ctx, &mut self.state, &envelope.message);
        self.record(action.name());
    }

    fn fire_output(
        &mut self,
        action: &OutputAction<S>,
        user: ExternalUserId,
    ) -> Result<(), ParallelError> {
        let outbox = {
            let ctx = ActionContext::for_output(&self.topology, self.node, user);
            action.fire(&ctx, &mut self.state)
        };
        self.steps += 1;

        // The whole outbox is held to the declaration before anything routes.
        for envelope in outbox.entries() {
            if !action.may_emit(envelope.message.message_type()) {
                return Err(ParallelError::UndeclaredEmission {
                    node: self.node,
                    action: action.name(),
                    message_type: envelope.message.type_name(),
                });
            }
        }

        for envelope in outbox.into_entries() {
            // A closed router means the runtime is shutting down.
            let _ = self.router_tx.send(RoutedEnvelope {
                from: self.node,
                action: action.name(),
                message: envelope.message,
                to: envelope.to,
            });
        }
        self.record(action.name());
        Ok(())
    }

    fn record(&mut self, action: &'static str) {
        *self.fired.entry(action).or_insert(0) += 1;
    }
}
