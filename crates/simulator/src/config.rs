//! Configuration types for scenarios.

use crate::topologies::TopologyShape;
use ioa_engine::SchedulingPolicy;
use std::time::Duration;

/// Which example protocol every node runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// Flood an injected value and confirm delivery to each external user.
    Broadcast,

    /// Elect the highest node index and announce it everywhere.
    Election,
}

/// Configuration for a scenario run.
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    /// Protocol instantiated at every node.
    pub protocol: Protocol,

    /// Shape of the communication graph.
    pub shape: TopologyShape,

    /// Number of nodes in the network.
    pub nodes: usize,

    /// Scheduling policy for the deterministic engine.
    /// The parallel runtime ignores it.
    pub policy: SchedulingPolicy,

    /// Optional step limit for the deterministic engine.
    pub max_steps: Option<u64>,

    /// Optional per-node input queue capacity for the deterministic engine.
    pub queue_capacity: Option<usize>,

    /// Value carried by the broadcast seed message.
    pub value: u64,

    /// How long to wait for every node to report before stopping the run.
    pub timeout: Duration,
}

impl ScenarioConfig {
    /// Create a scenario configuration with default sizing.
    pub fn new(protocol: Protocol, shape: TopologyShape) -> Self {
        Self {
            protocol,
            shape,
            nodes: 4,
            policy: SchedulingPolicy::RoundRobin,
            max_steps: None,
            queue_capacity: None,
            value: 42,
            timeout: Duration::from_secs(5),
        }
    }

    /// Set the number of nodes.
    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    /// Set the scheduling policy.
    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set a step limit.
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Set a per-node input queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set the broadcast seed value.
    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    /// Set the convergence deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::new(Protocol::Broadcast, TopologyShape::Ring)
    }
}
