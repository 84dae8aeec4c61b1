//! End-to-end protocol runs on small graphs.
//!
//! Each test drives an engine on another thread's behalf: a watcher
//! polls the external mailboxes for the expected confirmations, then
//! stops the engine. The runs themselves would otherwise block at
//! quiescence, which is the intended resting state of a finished
//! protocol.

use ioa_core::State;
use ioa_engine::{Engine, EngineConfig, ExternalMailbox, HaltReason, RunReport, SchedulingPolicy};
use ioa_protocols::broadcast::{self, Delivered, Seed};
use ioa_protocols::election::{self, Elected};
use ioa_types::{NodeIndex, Topology};
use std::thread;
use std::time::{Duration, Instant};

fn ring(nodes: usize) -> Topology {
    let rows: Vec<Vec<bool>> = (0..nodes)
        .map(|i| (0..nodes).map(|j| j == (i + 1) % nodes).collect())
        .collect();
    Topology::from_matrix(&rows).unwrap()
}

fn complete(nodes: usize) -> Topology {
    let rows: Vec<Vec<bool>> = (0..nodes)
        .map(|i| (0..nodes).map(|j| i != j).collect())
        .collect();
    Topology::from_matrix(&rows).unwrap()
}

fn attach_mailboxes<S: State>(engine: &mut Engine<S>, nodes: usize) -> Vec<ExternalMailbox> {
    (0..nodes)
        .map(|node| {
            let mailbox = ExternalMailbox::new();
            engine.register_sink(NodeIndex(node as u32), mailbox.clone());
            mailbox
        })
        .collect()
}

/// Run until `done` reports completion (or a deadline passes), then stop.
fn run_until<S, F>(engine: &mut Engine<S>, done: F) -> RunReport
where
    S: State,
    F: Fn() -> bool + Send + 'static,
{
    let stop = engine.stop_handle();
    let watcher = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline && !done() {
            thread::sleep(Duration::from_millis(5));
        }
        stop.stop();
    });
    let report = engine.run().expect("run failed");
    watcher.join().expect("watcher panicked");
    report
}

#[test]
fn test_broadcast_reaches_every_node_on_a_ring() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let nodes = 4;
    let mut engine = Engine::new(
        broadcast::signature().unwrap(),
        ring(nodes),
        EngineConfig::new(),
    );
    let mailboxes = attach_mailboxes(&mut engine, nodes);
    engine.injector().inject(NodeIndex(0), Seed(42)).unwrap();

    let watched = mailboxes.clone();
    let report = run_until(&mut engine, move || {
        watched.iter().all(|mailbox| !mailbox.is_empty())
    });

    assert_eq!(report.halt, HaltReason::StopRequested);
    for node in 0..nodes {
        let node = NodeIndex(node as u32);
        assert_eq!(engine.state(node).unwrap().value(), Some(42));
    }
    for mailbox in &mailboxes {
        let confirmations = mailbox.drain();
        assert_eq!(confirmations.len(), 1);
        assert_eq!(
            confirmations[0].message.downcast_ref::<Delivered>(),
            Some(&Delivered(42))
        );
    }
}

#[test]
fn test_broadcast_confirms_once_despite_duplicate_rumors() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // On a complete graph every node hears the rumor from several peers.
    let nodes = 3;
    let mut engine = Engine::new(
        broadcast::signature().unwrap(),
        complete(nodes),
        EngineConfig::new(),
    );
    let mailboxes = attach_mailboxes(&mut engine, nodes);
    engine.injector().inject(NodeIndex(1), Seed(5)).unwrap();

    let watched = mailboxes.clone();
    run_until(&mut engine, move || {
        watched.iter().all(|mailbox| !mailbox.is_empty())
    });

    for mailbox in &mailboxes {
        assert_eq!(mailbox.len(), 1);
    }
}

#[test]
fn test_broadcast_converges_under_random_scheduling() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let nodes = 4;
    let config = EngineConfig::new().with_policy(SchedulingPolicy::Random { seed: 97 });
    let mut engine = Engine::new(broadcast::signature().unwrap(), ring(nodes), config);
    let mailboxes = attach_mailboxes(&mut engine, nodes);
    engine.injector().inject(NodeIndex(2), Seed(11)).unwrap();

    let watched = mailboxes.clone();
    run_until(&mut engine, move || {
        watched.iter().all(|mailbox| !mailbox.is_empty())
    });

    for node in 0..nodes {
        let node = NodeIndex(node as u32);
        assert_eq!(engine.state(node).unwrap().value(), Some(11));
    }
}

#[test]
fn test_election_crowns_the_highest_index() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let nodes = 4;
    let mut engine = Engine::new(
        election::signature().unwrap(),
        complete(nodes),
        EngineConfig::new(),
    );
    let mailboxes = attach_mailboxes(&mut engine, nodes);

    // No injection needed: sharing is spontaneous.
    let watched = mailboxes.clone();
    let report = run_until(&mut engine, move || {
        watched.iter().all(|mailbox| !mailbox.is_empty())
    });

    for node in 0..nodes {
        let node = NodeIndex(node as u32);
        assert_eq!(engine.state(node).unwrap().leader(), Some(3));
        assert_eq!(report.fired_by(node, "share"), 1);
        assert_eq!(report.fired_by(node, "announce"), 1);
    }
    for mailbox in &mailboxes {
        let announcements = mailbox.drain();
        assert_eq!(announcements.len(), 1);
        assert_eq!(
            announcements[0].message.downcast_ref::<Elected>(),
            Some(&Elected(3))
        );
    }
}

#[test]
fn test_single_node_elects_itself() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut engine = Engine::new(
        election::signature().unwrap(),
        complete(1),
        EngineConfig::new(),
    );
    let mailboxes = attach_mailboxes(&mut engine, 1);

    let watched = mailboxes.clone();
    run_until(&mut engine, move || !watched[0].is_empty());

    assert_eq!(engine.state(NodeIndex(0)).unwrap().leader(), Some(0));
    assert_eq!(
        mailboxes[0].drain()[0].message.downcast_ref::<Elected>(),
        Some(&Elected(0))
    );
}
