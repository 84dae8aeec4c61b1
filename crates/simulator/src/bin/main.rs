//! Automata network simulator CLI
//!
//! Runs an example protocol over a standard graph shape, on either the
//! deterministic engine or the multi-core parallel runtime.
//!
//! # Example
//!
//! ```bash
//! # Broadcast over a 4-node ring on the deterministic engine
//! ioa-simulator --protocol broadcast --topology ring --nodes 4
//!
//! # Leader election with a seeded random schedule
//! ioa-simulator -p election -t complete -n 5 --seed 42
//!
//! # The same scenario on the parallel runtime
//! ioa-simulator -p election -t complete -n 5 --parallel
//! ```

use clap::{Parser, ValueEnum};
use ioa_engine::SchedulingPolicy;
use ioa_simulator::{ParallelScenario, Protocol, ScenarioConfig, ScenarioRunner, TopologyShape};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProtocolArg {
    Broadcast,
    Election,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Broadcast => Protocol::Broadcast,
            ProtocolArg::Election => Protocol::Election,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TopologyArg {
    Complete,
    Ring,
    Line,
}

impl From<TopologyArg> for TopologyShape {
    fn from(arg: TopologyArg) -> Self {
        match arg {
            TopologyArg::Complete => TopologyShape::Complete,
            TopologyArg::Ring => TopologyShape::Ring,
            TopologyArg::Line => TopologyShape::Line,
        }
    }
}

/// Automata Network Simulator
///
/// Runs an example protocol over a standard graph shape. Two modes:
/// - Deterministic (default): single scheduler, reproducible schedules
/// - Parallel (--parallel): one tokio task per node, multi-core
#[derive(Parser, Debug)]
#[command(name = "ioa-simulator")]
#[command(version, about, long_about = None)]
struct Args {
    /// Protocol to instantiate at every node
    #[arg(short = 'p', long, value_enum, default_value = "broadcast")]
    protocol: ProtocolArg,

    /// Shape of the communication graph
    #[arg(short = 't', long, value_enum, default_value = "ring")]
    topology: TopologyArg,

    /// Number of nodes
    #[arg(short = 'n', long, default_value = "4")]
    nodes: usize,

    /// Seed for the random scheduling policy. When set, the deterministic
    /// engine draws enabled actions from a seeded RNG instead of round-robin.
    #[arg(long)]
    seed: Option<u64>,

    /// Run on the multi-core parallel runtime instead of the deterministic engine
    #[arg(long)]
    parallel: bool,

    /// Value carried by the broadcast seed message
    #[arg(long, default_value = "42")]
    value: u64,

    /// Halt after this many engine steps (deterministic mode only)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Per-node input queue capacity (deterministic mode only)
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Give up on convergence after this many seconds
    #[arg(long, default_value = "5")]
    timeout: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,ioa_simulator=info")),
        )
        .init();

    let args = Args::parse();

    let policy = match args.seed {
        Some(seed) => SchedulingPolicy::Random { seed },
        None => SchedulingPolicy::RoundRobin,
    };

    let mut config = ScenarioConfig::new(args.protocol.into(), args.topology.into())
        .with_nodes(args.nodes)
        .with_policy(policy)
        .with_value(args.value)
        .with_timeout(Duration::from_secs(args.timeout));
    if let Some(max_steps) = args.max_steps {
        config = config.with_max_steps(max_steps);
    }
    if let Some(capacity) = args.queue_capacity {
        config = config.with_queue_capacity(capacity);
    }

    if args.parallel {
        run_parallel(config);
    } else {
        run_deterministic(config);
    }
}

fn run_deterministic(config: ScenarioConfig) {
    info!(
        nodes = config.nodes,
        policy = ?config.policy,
        "starting deterministic run"
    );

    let outcome = ScenarioRunner::new(config)
        .expect("failed to prepare scenario")
        .run()
        .expect("scenario run failed");

    outcome.print_summary();
}

fn run_parallel(config: ScenarioConfig) {
    info!(nodes = config.nodes, "starting parallel run");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    let outcome = rt.block_on(async {
        ParallelScenario::new(config)
            .expect("failed to prepare scenario")
            .run()
            .await
            .expect("scenario run failed")
    });

    outcome.print_summary();
}
