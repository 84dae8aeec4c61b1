//! Summary of a finished run.

use ioa_types::NodeIndex;
use std::collections::HashMap;
use std::fmt;

/// Why the run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// A [`StopHandle`](crate::StopHandle) asked the engine to halt.
    StopRequested,
    /// The configured step limit was reached.
    StepLimit,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::StopRequested => write!(f, "stop requested"),
            HaltReason::StepLimit => write!(f, "step limit reached"),
        }
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Total steps fired across all nodes.
    pub steps: u64,
    /// Firings per (node, action name).
    pub fired: HashMap<(NodeIndex, &'static str), u64>,
    /// Messages appended to node queues by routing (injections not included).
    pub delivered: u64,
    /// Messages handed to registered external sinks.
    pub external_delivered: u64,
    /// External deliveries dropped because no sink was registered.
    pub external_dropped: u64,
    pub halt: HaltReason,
}

impl RunReport {
    /// How many times `node` fired the action called `action`.
    pub fn fired_by(&self, node: NodeIndex, action: &str) -> u64 {
        self.fired
            .iter()
            .filter(|((n, name), _)| *n == node && *name == action)
            .map(|(_, count)| *count)
            .sum()
    }

    /// How many steps `node` took in total.
    pub fn fired_by_node(&self, node: NodeIndex) -> u64 {
        self.fired
            .iter()
            .filter(|((n, _), _)| *n == node)
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn print_summary(&self) {
        println!("\n=== Run Report ===");
        println!("Halt:               {}", self.halt);
        println!("Steps fired:        {}", self.steps);
        println!("Messages delivered: {}", self.delivered);
        println!("External delivered: {}", self.external_delivered);
        if self.external_dropped > 0 {
            println!("External dropped:   {}", self.external_dropped);
        }

        let mut per_action: HashMap<&'static str, u64> = HashMap::new();
        for ((_, name), count) in &self.fired {
            *per_action.entry(name).or_default() += count;
        }
        let mut rows: Vec<_> = per_action.into_iter().collect();
        rows.sort_by_key(|(name, _)| *name);
        for (name, count) in rows {
            println!("  {:<18}{}", name, count);
        }
    }
}
