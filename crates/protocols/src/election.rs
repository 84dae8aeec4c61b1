//! Leader election by maximum node index, for complete graphs.
//!
//! Every node shares its own index with all neighbors once, folds the
//! maximum over every claim it hears, and decides once it has heard from
//! every other node. The winner is the highest index in the network, and
//! every node announces the same winner to its external user.

use ioa_core::{
    Alphabet, InputAction, InternalAction, Outbox, OutputAction, Signature, ValidationError,
};
use ioa_types::{NodeIndex, Sender};
use std::collections::HashSet;
use tracing::info;

/// A node's candidacy, carrying its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim(pub u32);

/// The election result, announced to each node's external user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elected(pub u32);

#[derive(Debug, Default)]
pub struct ElectionState {
    /// Highest index seen so far, own index included once shared.
    best: Option<u32>,
    /// Peers whose claims arrived. Injected claims carry an external
    /// sender and do not count toward termination.
    heard: HashSet<NodeIndex>,
    shared: bool,
    decided: bool,
    announced: bool,
    leader: Option<u32>,
}

impl ElectionState {
    pub fn leader(&self) -> Option<u32> {
        self.leader
    }

    pub fn is_decided(&self) -> bool {
        self.decided
    }

    fn fold(&mut self, candidate: u32) {
        self.best = Some(self.best.map_or(candidate, |best| best.max(candidate)));
    }
}

/// The election automaton, identical at every node.
pub fn signature() -> Result<Signature<ElectionState>, ValidationError> {
    let alphabet = Alphabet::builder()
        .input::<Claim>()
        .output::<Claim>()
        .output::<Elected>()
        .build();

    Signature::build(
        alphabet,
        vec![InputAction::new(
            "hear",
            |ctx, state: &mut ElectionState, claim: &Claim| {
                state.fold(claim.0);
                if let Ok(Sender::Node(from)) = ctx.sender() {
                    state.heard.insert(from);
                }
            },
        )],
        vec![
            OutputAction::new(
                "share",
                |_, state: &ElectionState| !state.shared,
                |ctx, state: &mut ElectionState| {
                    state.shared = true;
                    state.fold(ctx.self_index().0);
                    Outbox::single(Claim(ctx.self_index().0), ctx.neighbors())
                },
            )
            .emits::<Claim>(),
            OutputAction::new(
                "announce",
                |_, state: &ElectionState| state.decided && !state.announced,
                |ctx, state: &mut ElectionState| match state.leader {
                    Some(id) => {
                        state.announced = true;
                        Outbox::single(Elected(id), ctx.external_user())
                    }
                    None => Outbox::new(),
                },
            )
            .emits::<Elected>(),
        ],
        vec![InternalAction::new(
            "crown",
            |ctx, state: &ElectionState| {
                state.shared && !state.decided && state.heard.len() + 1 == ctx.node_count()
            },
            |ctx, state: &mut ElectionState| {
                state.decided = true;
                state.leader = state.best;
                info!(node = ctx.self_index().0, leader = ?state.leader, "leader decided");
            },
        )],
    )
}
