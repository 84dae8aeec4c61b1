//! Flooding broadcast.
//!
//! The environment seeds a value into one node; every node that learns it
//! relays it to its out-neighbors exactly once and confirms the value to
//! its own external user. On a strongly connected graph every node ends
//! up holding the seeded value.

use ioa_core::{
    Alphabet, InputAction, Outbox, OutputAction, Signature, ValidationError,
};
use tracing::debug;

/// Environment-injected value to spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed(pub u64);

/// The value in flight between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rumor(pub u64);

/// Confirmation to a node's external user that the value arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered(pub u64);

/// Per-node progress. A node adopts the first value it learns and ignores
/// later ones, so a network seeded twice converges on whichever value
/// reached each node first.
#[derive(Debug, Default)]
pub struct BroadcastState {
    value: Option<u64>,
    relayed: bool,
    confirmed: bool,
}

impl BroadcastState {
    pub fn value(&self) -> Option<u64> {
        self.value
    }

    pub fn has_relayed(&self) -> bool {
        self.relayed
    }

    fn learn(&mut self, value: u64) {
        if self.value.is_none() {
            self.value = Some(value);
            debug!(value, "value learned");
        }
    }
}

/// The broadcast automaton, identical at every node.
pub fn signature() -> Result<Signature<BroadcastState>, ValidationError> {
    let alphabet = Alphabet::builder()
        .input::<Seed>()
        .input::<Rumor>()
        .output::<Rumor>()
        .output::<Delivered>()
        .build();

    Signature::build(
        alphabet,
        vec![
            InputAction::new("seed", |_, state: &mut BroadcastState, seed: &Seed| {
                state.learn(seed.0);
            }),
            InputAction::new("hear", |_, state: &mut BroadcastState, rumor: &Rumor| {
                state.learn(rumor.0);
            }),
        ],
        vec![
            OutputAction::new(
                "relay",
                |_, state: &BroadcastState| state.value.is_some() && !state.relayed,
                |ctx, state: &mut BroadcastState| match state.value {
                    Some(value) => {
                        state.relayed = true;
                        Outbox::single(Rumor(value), ctx.neighbors())
                    }
                    None => Outbox::new(),
                },
            )
            .emits::<Rumor>(),
            OutputAction::new(
                "confirm",
                |_, state: &BroadcastState| state.value.is_some() && !state.confirmed,
                |ctx, state: &mut BroadcastState| match state.value {
                    Some(value) => {
                        state.confirmed = true;
                        Outbox::single(Delivered(value), ctx.external_user())
                    }
                    None => Outbox::new(),
                },
            )
            .emits::<Delivered>(),
        ],
        Vec::new(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioa_core::{ActionContext, Message, MessageType};
    use ioa_types::{ExternalUserId, NodeIndex, Sender, Topology};

    fn duo() -> Topology {
        Topology::from_matrix(&[vec![false, true], vec![true, false]]).unwrap()
    }

    #[test]
    fn test_signature_validates() {
        let signature = signature().unwrap();
        assert_eq!(signature.input_actions().len(), 2);
        assert_eq!(signature.output_actions().len(), 2);
        assert!(signature.alphabet().is_input(MessageType::of::<Seed>()));
        assert!(signature.alphabet().is_output(MessageType::of::<Delivered>()));
    }

    #[test]
    fn test_first_value_wins() {
        let signature = signature().unwrap();
        let topology = duo();
        let ctx = ActionContext::for_input(
            &topology,
            NodeIndex(0),
            ExternalUserId(0),
            Sender::External(ExternalUserId(0)),
        );
        let mut state = BroadcastState::default();

        let seed = &signature.input_actions()[0];
        seed.deliver(&ctx, &mut state, &Message::new(Seed(42)));
        seed.deliver(&ctx, &mut state, &Message::new(Seed(9)));
        assert_eq!(state.value(), Some(42));

        let hear = &signature.input_actions()[1];
        hear.deliver(&ctx, &mut state, &Message::new(Rumor(7)));
        assert_eq!(state.value(), Some(42));
    }

    #[test]
    fn test_relay_fires_once_toward_neighbors() {
        let signature = signature().unwrap();
        let topology = duo();
        let ctx = ActionContext::for_output(&topology, NodeIndex(0), ExternalUserId(0));
        let mut state = BroadcastState::default();

        let relay = &signature.output_actions()[0];
        assert!(!relay.enabled(&ctx, &state));

        state.learn(5);
        assert!(relay.enabled(&ctx, &state));

        let outbox = relay.fire(&ctx, &mut state);
        assert_eq!(outbox.len(), 1);
        assert!(outbox.entries()[0].message.is::<Rumor>());
        assert!(!relay.enabled(&ctx, &state));
    }
}
