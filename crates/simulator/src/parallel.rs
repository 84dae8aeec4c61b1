//! Parallel scenario runner.
//!
//! Same protocol and graph vocabulary as the deterministic runner, executed
//! on the tokio-backed runtime for multi-core runs. Interleavings vary
//! between runs, so outcomes are checked for convergence, not step counts.

use crate::config::{Protocol, ScenarioConfig};
use crate::runner::ScenarioOutcome;
use crate::topologies::TopologyShape;
use ioa_core::{Message, Signature, State, ValidationError};
use ioa_engine::{ExternalMailbox, InjectError};
use ioa_parallel::{ParallelEngine, ParallelError};
use ioa_protocols::broadcast::{self, Seed};
use ioa_protocols::election;
use ioa_types::{NodeIndex, Topology, TopologyError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from parallel scenario runs.
#[derive(Debug, Error)]
pub enum ParallelScenarioError {
    #[error("topology rejected: {0}")]
    Topology(#[from] TopologyError),

    #[error("signature rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("injection rejected: {0}")]
    Inject(#[from] InjectError),

    #[error("runtime fault: {0}")]
    Runtime(#[from] ParallelError),
}

/// Runs one scenario on the parallel runtime.
pub struct ParallelScenario {
    config: ScenarioConfig,
    topology: Topology,
}

impl ParallelScenario {
    /// Build the graph for `config` and validate the combination.
    pub fn new(config: ScenarioConfig) -> Result<Self, ParallelScenarioError> {
        let topology = config.shape.build(config.nodes)?;

        if config.protocol == Protocol::Election && config.shape != TopologyShape::Complete {
            warn!("leader election only decides when every node hears every other");
        }

        info!(
            protocol = ?config.protocol,
            shape = ?config.shape,
            nodes = config.nodes,
            "parallel scenario prepared"
        );

        Ok(Self { config, topology })
    }

    /// Run to convergence or deadline, then shut the network down.
    pub async fn run(self) -> Result<ScenarioOutcome, ParallelScenarioError> {
        match self.config.protocol {
            Protocol::Broadcast => {
                let kickoff = Message::new(Seed(self.config.value));
                self.run_with(broadcast::signature()?, Some(kickoff)).await
            }
            Protocol::Election => self.run_with(election::signature()?, None).await,
        }
    }

    async fn run_with<S: State>(
        self,
        signature: Signature<S>,
        kickoff: Option<Message>,
    ) -> Result<ScenarioOutcome, ParallelScenarioError> {
        let mut engine = ParallelEngine::new(signature, self.topology);
        let mailboxes: Vec<ExternalMailbox> = (0..self.config.nodes)
            .map(|node| {
                let mailbox = ExternalMailbox::new();
                engine.register_sink(NodeIndex(node as u32), mailbox.clone());
                mailbox
            })
            .collect();

        engine.start().await?;
        if let Some(message) = kickoff {
            engine.inject_message(NodeIndex(0), message)?;
        }

        let deadline = Instant::now() + self.config.timeout;
        let all_reported = |boxes: &[ExternalMailbox]| boxes.iter().all(|m| !m.is_empty());
        let mut converged = all_reported(&mailboxes);
        while !converged && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
            converged = all_reported(&mailboxes);
        }

        let report = engine.shutdown().await?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use ioa_protocols::broadcast::Delivered;
    use ioa_protocols::election::Elected;

    #[tokio::test]
    async fn test_parallel_broadcast_scenario_converges() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let config = ScenarioConfig::new(Protocol::Broadcast, TopologyShape::Ring)
            .with_nodes(3)
            .with_value(9);
        let outcome = ParallelScenario::new(config).unwrap().run().await.unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.deliveries.len(), 3);
        for delivery in &outcome.deliveries {
            assert_eq!(
                delivery.message.downcast_ref::<Delivered>(),
                Some(&Delivered(9))
            );
        }
    }

    #[tokio::test]
    async fn test_parallel_election_scenario_converges() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let config = ScenarioConfig::new(Protocol::Election, TopologyShape::Complete).with_nodes(4);
        let outcome = ParallelScenario::new(config).unwrap().run().await.unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.deliveries.len(), 4);
        for delivery in &outcome.deliveries {
            assert_eq!(
                delivery.message.downcast_ref::<Elected>(),
                Some(&Elected(3))
            );
        }
    }
}
