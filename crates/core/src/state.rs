//! Per-automaton state.

/// State owned by a single automaton.
///
/// The engine creates one fresh (`Default`) value per graph node and keeps
/// it exclusively owned by that node: an action of node `n` sees `n`'s
/// state and no other. Initial data is seeded by injecting input messages,
/// not by constructing states externally.
///
/// Blanket-implemented for every eligible type.
pub trait State: Default + Send + 'static {}

impl<T: Default + Send + 'static> State for T {}
