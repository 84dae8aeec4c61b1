//! Engine configuration.

/// How the engine picks among enabled actions.
///
/// Weak fairness is the contract: an action that stays enabled must
/// eventually fire. Round-robin satisfies it exactly; seeded random
/// selection satisfies it with probability one and is reproducible for a
/// fixed seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingPolicy {
    /// Cycle a cursor over (node, action) slots; the first enabled slot at
    /// or after the cursor fires.
    RoundRobin,
    /// Uniform choice over the enabled set, driven by a seeded generator.
    Random {
        /// Seed for the schedule. Same seed, same run.
        seed: u64,
    },
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        SchedulingPolicy::RoundRobin
    }
}

/// Configuration for a deterministic engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Selection policy among enabled actions.
    pub policy: SchedulingPolicy,

    /// Halt after this many steps. `None` runs until stopped.
    pub max_steps: Option<u64>,

    /// Per-node input queue bound. `None` means unbounded; exceeding a
    /// bound is fatal.
    pub queue_capacity: Option<usize>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
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

    /// Bound every input queue.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }
}
