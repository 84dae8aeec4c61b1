//! Weakly fair selection among locally controlled action slots.

use crate::config::SchedulingPolicy;
use ioa_types::NodeIndex;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// One schedulable unit: a node paired with its input delivery slot or
/// with one of its output/internal actions by index within the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub node: NodeIndex,
    pub kind: SlotKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotKind {
    /// Deliver the head of the node's queue; the head's type picks the
    /// bound action.
    Input,
    Output(usize),
    Internal(usize),
}

/// Picks the next slot to fire among those currently enabled.
///
/// Round-robin keeps a cursor over the fixed slot list and resumes scanning
/// just past the last firing, so an always-enabled slot fires every
/// `slots.len()` steps at worst. Random draws uniformly from the enabled
/// set with a seeded generator, which makes runs repeatable and starves no
/// persistently enabled slot with probability one.
pub(crate) struct Scheduler {
    slots: Vec<Slot>,
    cursor: usize,
    rng: Option<ChaCha8Rng>,
}

impl Scheduler {
    /// Lay out slots node-major: for each node, its input slot, then its
    /// output slots, then its internal slots.
    pub fn new(
        nodes: usize,
        outputs: usize,
        internals: usize,
        policy: SchedulingPolicy,
    ) -> Self {
        let mut slots = Vec::with_capacity(nodes * (1 + outputs + internals));
        for node in 0..nodes {
            let node = NodeIndex(node as u32);
            slots.push(Slot { node, kind: SlotKind::Input });
            for i in 0..outputs {
                slots.push(Slot { node, kind: SlotKind::Output(i) });
            }
            for i in 0..internals {
                slots.push(Slot { node, kind: SlotKind::Internal(i) });
            }
        }
        let rng = match policy {
            SchedulingPolicy::RoundRobin => None,
            SchedulingPolicy::Random { seed } => Some(ChaCha8Rng::seed_from_u64(seed)),
        };
        Self { slots, cursor: 0, rng }
    }

    /// Select an enabled slot, or `None` when nothing is enabled.
    ///
    /// `enabled` is consulted at most once per slot per call.
    pub fn select<F>(&mut self, mut enabled: F) -> Option<Slot>
    where
        F: FnMut(Slot) -> bool,
    {
        if self.slots.is_empty() {
            return None;
        }
        match &mut self.rng {
            None => {
                let len = self.slots.len();
                for offset in 0..len {
                    let idx = (self.cursor + offset) % len;
                    let slot = self.slots[idx];
                    if enabled(slot) {
                        self.cursor = (idx + 1) % len;
                        return Some(slot);
                    }
                }
                None
            }
            Some(rng) => {
                let candidates: Vec<Slot> =
                    self.slots.iter().copied().filter(|&s| enabled(s)).collect();
                if candidates.is_empty() {
                    return None;
                }
                let pick = rng.gen_range(0..candidates.len());
                Some(candidates[pick])
            }
        }
    }
}
