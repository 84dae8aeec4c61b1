//! The single-process network engine.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::handles::{Injector, StopHandle};
use crate::mailbox::{Inboxes, Signal};
use crate::report::{HaltReason, RunReport};
use crate::router::Router;
use crate::scheduler::{Scheduler, Slot, SlotKind};
use crate::sink::ExternalSink;
use ioa_core::{ActionContext, Signature, State};
use ioa_types::{ExternalUserId, NodeIndex, Topology};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Lifecycle of an engine. Strictly one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Built and validated, not yet run.
    Configured,
    /// Inside [`Engine::run`].
    Running,
    /// Run finished, normally or fatally. The final states stay readable.
    Halted,
}

/// Executes one automaton per topology node, single-threaded.
///
/// Every node runs the same signature over its own state. A step is one
/// action firing at one node; the scheduler picks the node and action,
/// the router moves what output actions emit. When no action is enabled
/// anywhere the engine blocks until an injection arrives or a
/// [`StopHandle`] fires: a quiescent network is idle, not finished.
pub struct Engine<S: State> {
    signature: Arc<Signature<S>>,
    topology: Arc<Topology>,
    states: Vec<S>,
    inboxes: Arc<Inboxes>,
    signal: Arc<Signal>,
    stop: Arc<AtomicBool>,
    router: Router,
    scheduler: Scheduler,
    config: EngineConfig,
    phase: Phase,
    steps: u64,
    fired: HashMap<(NodeIndex, &'static str), u64>,
}

impl<S: State> Engine<S> {
    /// Instantiate `signature` at every node of `topology`.
    ///
    /// Each node starts from `S::default()` with an empty queue.
    pub fn new(signature: Signature<S>, topology: Topology, config: EngineConfig) -> Self {
        let nodes = topology.node_count();
        let topology = Arc::new(topology);
        info!(
            nodes,
            inputs = signature.input_actions().len(),
            outputs = signature.output_actions().len(),
            internals = signature.internal_actions().len(),
            "network configured"
        );
        Self {
            scheduler: Scheduler::new(
                nodes,
                signature.output_actions().len(),
                signature.internal_actions().len(),
                config.policy,
            ),
            router: Router::new(Arc::clone(&topology)),
            signature: Arc::new(signature),
            topology,
            states: (0..nodes).map(|_| S::default()).collect(),
            inboxes: Arc::new(Inboxes::new(nodes, config.queue_capacity)),
            signal: Arc::new(Signal::default()),
            stop: Arc::new(AtomicBool::new(false)),
            config,
            phase: Phase::Configured,
            steps: 0,
            fired: HashMap::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// A handle for feeding messages in from other threads.
    pub fn injector(&self) -> Injector {
        Injector::new(
            self.signature.alphabet().clone(),
            Arc::clone(&self.inboxes),
            Arc::clone(&self.signal),
            self.states.len(),
        )
    }

    /// A handle for requesting a halt from other threads.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.stop), Arc::clone(&self.signal))
    }

    /// Attach the sink that receives `node`'s external deliveries.
    ///
    /// Panics if `node` is outside the network.
    pub fn register_sink(&mut self, node: NodeIndex, sink: impl ExternalSink + 'static) {
        self.router.register_sink(node, Box::new(sink));
    }

    /// Read a node's state. Useful between runs and in tests.
    pub fn state(&self, node: NodeIndex) -> Option<&S> {
        self.states.get(node.as_usize())
    }

    /// Drive the network until stopped or the step limit is hit.
    ///
    /// Fatal errors (illegal destination, queue overflow, undeclared
    /// emission) halt the engine and surface here; a later `run` call
    /// returns [`EngineError::AlreadyHalted`].
    pub fn run(&mut self) -> Result<RunReport, EngineError> {
        if self.phase == Phase::Halted {
            return Err(EngineError::AlreadyHalted);
        }
        self.phase = Phase::Running;
        info!(policy = ?self.config.policy, "run started");

        let halt = loop {
            if self.stop.load(Ordering::Acquire) {
                break HaltReason::StopRequested;
            }
            if self.config.max_steps.is_some_and(|limit| self.steps >= limit) {
                break HaltReason::StepLimit;
            }

            // Snapshot before scanning so an injection that lands mid-scan
            // makes the wait below return immediately.
            let seen = self.signal.snapshot();
            match self.next_enabled() {
                Some(slot) => {
                    if let Err(err) = self.fire(slot) {
                        self.phase = Phase::Halted;
                        return Err(err);
                    }
                    self.steps += 1;
                }
                None => self.signal.wait_past(seen),
            }
        };

        self.phase = Phase::Halted;
        info!(steps = self.steps, halt = %halt, "run halted");
        Ok(RunReport {
            steps: self.steps,
            fired: std::mem::take(&mut self.fired),
            delivered: self.router.delivered(),
            external_delivered: self.router.external_delivered(),
            external_dropped: self.router.external_dropped(),
            halt,
        })
    }

    fn next_enabled(&mut self) -> Option<Slot> {
        let scheduler = &mut self.scheduler;
        let states = &self.states;
        let inboxes = &self.inboxes;
        let signature = &self.signature;
        let topology = &self.topology;
        scheduler.select(|slot| {
            let node = slot.node;
            match slot.kind {
                // Only a head some input action binds enables delivery; an
                // unbound head leaves the queue waiting.
                SlotKind::Input => inboxes.head_type(node).is_some_and(|ty| {
                    signature.input_actions().iter().any(|a| a.binds() == ty)
                }),
                SlotKind::Output(i) => {
                    let ctx =
                        ActionContext::for_output(topology, node, ExternalUserId::for_node(node));
                    signature.output_actions()[i].enabled(&ctx, &states[node.as_usize()])
                }
                SlotKind::Internal(i) => {
                    let ctx =
                        ActionContext::for_internal(topology, node, ExternalUserId::for_node(node));
                    signature.internal_actions()[i].enabled(&ctx, &states[node.as_usize()])
                }
            }
        })
    }

    fn fire(&mut self, slot: Slot) -> Result<(), EngineError> {
        let signature = Arc::clone(&self.signature);
        let topology = Arc::clone(&self.topology);
        let node = slot.node;
        let user = ExternalUserId::for_node(node);

        match slot.kind {
            SlotKind::Input => {
                let Some(envelope) = self.inboxes.pop(node) else {
                    return Ok(());
                };
                let ty = envelope.message.message_type();
                let action = signature
                    .input_actions()
                    .iter()
                    .find(|a| a.binds() == ty)
                    .expect("input slot fired with a head no action binds");
                debug!(node = node.0, action = action.name(), "input delivered");
                let ctx = ActionContext::for_input(&topology, node, user, envelope.sender);
                action.deliver(&ctx, &mut self.states[node.as_usize()], &envelope.message);
                self.record(node, action.name());
            }
            SlotKind::Output(i) => {
                let action = &signature.output_actions()[i];
                let outbox = {
                    let ctx = ActionContext::for_output(&topology, node, user);
                    action.fire(&ctx, &mut self.states[node.as_usize()])
                };
                // Hold the whole outbox to the declaration before routing
                // any of it.
                for envelope in outbox.entries() {
                    if !action.may_emit(envelope.message.message_type()) {
                        return Err(EngineError::UndeclaredEmission {
                            node,
                            action: action.name(),
                            message_type: envelope.message.type_name(),
                        });
                    }
                }
                debug!(
                    node = node.0,
                    action = action.name(),
                    entries = outbox.len(),
                    "output fired"
                );
                self.router.dispatch(node, action.name(), outbox, &self.inboxes)?;
                self.record(node, action.name());
            }
            SlotKind::Internal(i) => {
                let action = &signature.internal_actions()[i];
                debug!(node = node.0, action = action.name(), "internal fired");
                let ctx = ActionContext::for_internal(&topology, node, user);
                action.fire(&ctx, &mut self.states[node.as_usize()]);
                self.record(node, action.name());
            }
        }
        Ok(())
    }

    fn record(&mut self, node: NodeIndex, action: &'static str) {
        *self.fired.entry((node, action)).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioa_core::{Alphabet, InputAction};

    #[derive(Debug)]
    struct Nudge;
    #[derive(Debug)]
    struct Stray;

    #[derive(Debug, Default)]
    struct Tally {
        nudges: u64,
    }

    fn tally_signature() -> Signature<Tally> {
        let alphabet = Alphabet::builder()
            .input::<Nudge>()
            .input::<Stray>()
            .output::<Nudge>()
            .build();
        Signature::build(
            alphabet,
            vec![InputAction::new("nudge", |_, state: &mut Tally, _: &Nudge| {
                state.nudges += 1;
            })],
            Vec::new(),
            Vec::new(),
        )
        .unwrap()
    }

    fn duo() -> Topology {
        Topology::from_matrix(&[vec![false, true], vec![true, false]]).unwrap()
    }

    #[test]
    fn test_new_engine_is_configured() {
        let engine = Engine::new(tally_signature(), duo(), EngineConfig::new());
        assert_eq!(engine.phase(), Phase::Configured);
        assert_eq!(engine.state(NodeIndex(0)).unwrap().nudges, 0);
        assert!(engine.state(NodeIndex(9)).is_none());
    }

    #[test]
    fn test_zero_step_limit_halts_immediately() {
        let config = EngineConfig::new().with_max_steps(0);
        let mut engine = Engine::new(tally_signature(), duo(), config);
        let report = engine.run().unwrap();
        assert_eq!(report.halt, HaltReason::StepLimit);
        assert_eq!(report.steps, 0);
        assert_eq!(engine.phase(), Phase::Halted);
    }

    #[test]
    fn test_run_after_halt_is_an_error() {
        let config = EngineConfig::new().with_max_steps(0);
        let mut engine = Engine::new(tally_signature(), duo(), config);
        engine.run().unwrap();
        assert!(matches!(engine.run(), Err(EngineError::AlreadyHalted)));
    }

    #[test]
    fn test_injected_input_reaches_its_action() {
        let config = EngineConfig::new().with_max_steps(1);
        let mut engine = Engine::new(tally_signature(), duo(), config);
        engine.injector().inject(NodeIndex(0), Nudge).unwrap();

        let report = engine.run().unwrap();
        assert_eq!(report.steps, 1);
        assert_eq!(report.fired_by(NodeIndex(0), "nudge"), 1);
        assert_eq!(engine.state(NodeIndex(0)).unwrap().nudges, 1);
    }

    #[test]
    fn test_unbound_head_blocks_its_queue() {
        use std::thread;
        use std::time::Duration;

        // Stray is in the input alphabet but no action binds it, so a
        // Stray head never enables delivery and the Nudge behind it waits.
        let mut engine = Engine::new(tally_signature(), duo(), EngineConfig::new());
        let injector = engine.injector();
        injector.inject(NodeIndex(0), Stray).unwrap();
        injector.inject(NodeIndex(0), Nudge).unwrap();

        let stop = engine.stop_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stop.stop();
        });

        let report = engine.run().unwrap();
        stopper.join().unwrap();

        assert_eq!(report.halt, HaltReason::StopRequested);
        assert_eq!(report.steps, 0);
        assert_eq!(engine.state(NodeIndex(0)).unwrap().nudges, 0);
        assert_eq!(engine.inboxes.len(NodeIndex(0)), 2);
    }
}
