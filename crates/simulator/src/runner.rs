//! Deterministic scenario runner.
//!
//! Builds a protocol signature and a graph from a [`ScenarioConfig`], wires
//! mailboxes to every node, kicks the protocol off, and runs the
//! deterministic engine until every node has reported or a deadline passes.

use crate::config::{Protocol, ScenarioConfig};
use crate::topologies::TopologyShape;
use ioa_core::{Message, Signature, State, ValidationError};
use ioa_engine::{
    Engine, EngineConfig, EngineError, ExternalDelivery, ExternalMailbox, InjectError, RunReport,
};
use ioa_protocols::broadcast::{self, Seed};
use ioa_protocols::election;
use ioa_types::{NodeIndex, Topology, TopologyError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from deterministic scenario runs.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("topology rejected: {0}")]
    Topology(#[from] TopologyError),

    #[error("signature rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("injection rejected: {0}")]
    Inject(#[from] InjectError),

    #[error("engine fault: {0}")]
    Engine(#[from] EngineError),
}

/// What a finished scenario produced.
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// Counters from the run.
    pub report: RunReport,

    /// Everything the nodes handed to their external users, in node order.
    pub deliveries: Vec<ExternalDelivery>,

    /// Whether every node reported to its external user before the deadline.
    pub converged: bool,
}

impl ScenarioOutcome {
    /// Print the run report and the external deliveries to stdout.
    pub fn print_summary(&self) {
        self.report.print_summary();

        println!("\n=== External Deliveries ===");
        if !self.converged {
            println!("(stopped at the deadline before every node reported)");
        }
        for delivery in &self.deliveries {
            println!("{} -> {}: {:?}", delivery.from, delivery.user, delivery.message);
        }
    }
}

/// Runs one scenario on the deterministic engine.
pub struct ScenarioRunner {
    config: ScenarioConfig,
    topology: Topology,
}

impl ScenarioRunner {
    /// Build the graph for `config` and validate the combination.
    pub fn new(config: ScenarioConfig) -> Result<Self, ScenarioError> {
        let topology = config.shape.build(config.nodes)?;

        if config.protocol == Protocol::Election && config.shape != TopologyShape::Complete {
            warn!("leader election only decides when every node hears every other");
        }

        info!(
            protocol = ?config.protocol,
            shape = ?config.shape,
            nodes = config.nodes,
            policy = ?config.policy,
            "scenario prepared"
        );

        Ok(Self { config, topology })
    }

    /// Run to convergence or deadline and collect the outcome.
    pub fn run(self) -> Result<ScenarioOutcome, ScenarioError> {
        match self.config.protocol {
            Protocol::Broadcast => {
                let kickoff = Message::new(Seed(self.config.value));
                self.run_with(broadcast::signature()?, Some(kickoff))
            }
            Protocol::Election => self.run_with(election::signature()?, None),
        }
    }

    fn run_with<S: State>(
        self,
        signature: Signature<S>,
        kickoff: Option<Message>,
    ) -> Result<ScenarioOutcome, ScenarioError> {
        let mut engine_config = EngineConfig::new().with_policy(self.config.policy);
        if let Some(max_steps) = self.config.max_steps {
            engine_config = engine_config.with_max_steps(max_steps);
        }
        if let Some(capacity) = self.config.queue_capacity {
            engine_config = engine_config.with_queue_capacity(capacity);
        }

        let mut engine = Engine::new(signature, self.topology, engine_config);
        let mailboxes: Vec<ExternalMailbox> = (0..self.config.nodes)
            .map(|node| {
                let mailbox = ExternalMailbox::new();
                engine.register_sink(NodeIndex(node as u32), mailbox.clone());
                mailbox
            })
            .collect();

        if let Some(message) = kickoff {
            engine.injector().inject_message(NodeIndex(0), message)?;
        }

        // A quiescent engine blocks instead of returning, so a watcher
        // thread requests the stop once every mailbox holds a delivery,
        // the deadline passes, or the engine halts on its own.
        let stop = engine.stop_handle();
        let halted = Arc::new(AtomicBool::new(false));
        let watcher = {
            let watched = mailboxes.clone();
            let halted = Arc::clone(&halted);
            let deadline = Instant::now() + self.config.timeout;
            thread::spawn(move || {
                let all_reported = || watched.iter().all(|mailbox| !mailbox.is_empty());
                let converged = loop {
                    if all_reported() {
                        break true;
                    }
                    if halted.load(Ordering::Acquire) {
                        break all_reported();
                    }
                    if Instant::now() >= deadline {
                        break false;
                    }
                    thread::sleep(Duration::from_millis(2));
                };
                stop.stop();
                converged
            })
        };

        let result = engine.run();
        halted.store(true, Ordering::Release);
        let converged = watcher.join().expect("watcher thread panicked");
        let report = result?;

        let deliveries = mailboxes
            .iter()
            .flat_map(|mailbox| mailbox.drain())
            .collect();
        Ok(ScenarioOutcome {
            report,
            deliveries,
            converged,
        })
    }
}
