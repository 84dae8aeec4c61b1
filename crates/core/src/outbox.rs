//! Messages produced by one output-action firing.

use crate::message::{Message, Payload};
use ioa_types::{Destination, ExternalUserId, NodeIndex};

/// Destination list for one outbox entry.
///
/// The coercions cover the shapes protocol code naturally has on hand:
/// a single node, the external user, a neighbor vector, or explicit
/// destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destinations(Vec<Destination>);

impl Destinations {
    /// The underlying destination vector.
    pub fn into_vec(self) -> Vec<Destination> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Destination> for Destinations {
    fn from(d: Destination) -> Self {
        Destinations(vec![d])
    }
}

impl From<NodeIndex> for Destinations {
    fn from(n: NodeIndex) -> Self {
        Destinations(vec![Destination::Node(n)])
    }
}

impl From<ExternalUserId> for Destinations {
    fn from(u: ExternalUserId) -> Self {
        Destinations(vec![Destination::External(u)])
    }
}

impl From<Vec<NodeIndex>> for Destinations {
    fn from(nodes: Vec<NodeIndex>) -> Self {
        Destinations(nodes.into_iter().map(Destination::Node).collect())
    }
}

impl From<&[NodeIndex]> for Destinations {
    fn from(nodes: &[NodeIndex]) -> Self {
        Destinations(nodes.iter().copied().map(Destination::Node).collect())
    }
}

impl From<Vec<Destination>> for Destinations {
    fn from(destinations: Vec<Destination>) -> Self {
        Destinations(destinations)
    }
}

/// One message together with everywhere it goes.
///
/// Multi-destination entries share the payload; the router clones the
/// envelope per destination, not the value.
#[derive(Debug, Clone)]
pub struct OutboundEnvelope {
    /// The message value.
    pub message: Message,
    /// Destinations, in send order.
    pub to: Vec<Destination>,
}

/// Ordered messages-to-send collection returned by an output effect.
#[derive(Debug, Default)]
pub struct Outbox {
    entries: Vec<OutboundEnvelope>,
}

impl Outbox {
    /// An empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// An outbox with a single entry.
    pub fn single(message: impl Payload, to: impl Into<Destinations>) -> Self {
        let mut outbox = Self::new();
        outbox.push(message, to);
        outbox
    }

    /// Append a payload going to `to`.
    ///
    /// An empty destination list is a vacuous send: the entry is kept but
    /// routes to nobody.
    pub fn push<M: Payload>(&mut self, message: M, to: impl Into<Destinations>) {
        self.push_message(Message::new(message), to);
    }

    /// Append an already-wrapped message going to `to`.
    pub fn push_message(&mut self, message: Message, to: impl Into<Destinations>) {
        self.entries.push(OutboundEnvelope {
            message,
            to: to.into().into_vec(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in emission order.
    pub fn entries(&self) -> &[OutboundEnvelope] {
        &self.entries
    }

    /// Consume into the entry vector.
    pub fn into_entries(self) -> Vec<OutboundEnvelope> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Rumor {
        value: u64,
    }

    #[test]
    fn test_push_to_neighbors() {
        let neighbors = vec![NodeIndex(1), NodeIndex(2)];
        let mut outbox = Outbox::new();
        outbox.push(Rumor { value: 9 }, neighbors);

        assert_eq!(outbox.len(), 1);
        let entry = &outbox.entries()[0];
        assert_eq!(
            entry.to,
            vec![
                Destination::Node(NodeIndex(1)),
                Destination::Node(NodeIndex(2))
            ]
        );
        assert!(entry.message.is::<Rumor>());
    }

    #[test]
    fn test_single_to_external_user() {
        let outbox = Outbox::single(Rumor { value: 1 }, ExternalUserId(4));
        assert_eq!(
            outbox.entries()[0].to,
            vec![Destination::External(ExternalUserId(4))]
        );
    }

    #[test]
    fn test_mixed_destinations() {
        let mut outbox = Outbox::new();
        outbox.push(
            Rumor { value: 2 },
            vec![
                Destination::Node(NodeIndex(0)),
                Destination::External(ExternalUserId(0)),
            ],
        );
        outbox.push(Rumor { value: 3 }, NodeIndex(1));

        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox.entries()[1].to, vec![Destination::Node(NodeIndex(1))]);
    }

    #[test]
    fn test_vacuous_send() {
        let mut outbox = Outbox::new();
        outbox.push(Rumor { value: 0 }, Vec::<NodeIndex>::new());

        assert_eq!(outbox.len(), 1);
        assert!(outbox.entries()[0].to.is_empty());
    }
}
