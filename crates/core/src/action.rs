//! The three action families.
//!
//! Actions are plain structs over closures rather than a trait hierarchy:
//! each carries its name, its typing obligations (the bound input type or
//! the declared emission set), and its behavior. The engine drives them
//! through [`enabled`](OutputAction::enabled) / fire calls with an
//! explicitly passed [`ActionContext`].

use crate::context::ActionContext;
use crate::message::{Message, MessageType, Payload};
use crate::outbox::Outbox;
use crate::state::State;
use std::fmt;
use std::sync::Arc;

type InputHandler<S> = Arc<dyn Fn(&ActionContext<'_>, &mut S, &Message) + Send + Sync>;
type Predicate<S> = Arc<dyn Fn(&ActionContext<'_>, &S) -> bool + Send + Sync>;
type OutputEffect<S> = Arc<dyn Fn(&ActionContext<'_>, &mut S) -> Outbox + Send + Sync>;
type InternalEffect<S> = Arc<dyn Fn(&ActionContext<'_>, &mut S) + Send + Sync>;

/// Delivers messages of one bound type into the state.
///
/// Input actions have no predicate: an automaton is input-enabled by axiom,
/// and the engine gates firing purely on queue contents.
pub struct InputAction<S> {
    name: &'static str,
    binds: MessageType,
    handler: InputHandler<S>,
}

impl<S: State> InputAction<S> {
    /// Bind a handler to the one message type it consumes.
    pub fn new<M, F>(name: &'static str, handler: F) -> Self
    where
        M: Payload,
        F: Fn(&ActionContext<'_>, &mut S, &M) + Send + Sync + 'static,
    {
        let erased: InputHandler<S> = Arc::new(move |ctx, state, message| {
            let body = message
                .downcast_ref::<M>()
                .expect("input handler invoked with a message of the wrong type");
            handler(ctx, state, body);
        });
        Self {
            name,
            binds: MessageType::of::<M>(),
            handler: erased,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The message type this action consumes.
    pub fn binds(&self) -> MessageType {
        self.binds
    }

    /// Deliver one message. Callers must have checked the type against
    /// [`binds`](Self::binds); the engine's enabledness test does.
    pub fn deliver(&self, ctx: &ActionContext<'_>, state: &mut S, message: &Message) {
        (self.handler)(ctx, state, message);
    }
}

impl<S> Clone for InputAction<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            binds: self.binds,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<S> fmt::Debug for InputAction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputAction")
            .field("name", &self.name)
            .field("binds", &self.binds.short_name())
            .finish()
    }
}

/// Emits messages when its predicate holds on the local state.
pub struct OutputAction<S> {
    name: &'static str,
    emits: Vec<MessageType>,
    pred: Predicate<S>,
    act: OutputEffect<S>,
}

impl<S: State> OutputAction<S> {
    /// An output action from a predicate and an effect.
    ///
    /// Declare what it may emit with [`emits`](Self::emits); validation
    /// checks the declaration against the alphabet, and the router holds
    /// every fired payload to it.
    pub fn new<P, F>(name: &'static str, pred: P, act: F) -> Self
    where
        P: Fn(&ActionContext<'_>, &S) -> bool + Send + Sync + 'static,
        F: Fn(&ActionContext<'_>, &mut S) -> Outbox + Send + Sync + 'static,
    {
        Self {
            name,
            emits: Vec::new(),
            pred: Arc::new(pred),
            act: Arc::new(act),
        }
    }

    /// Declare a message type this action may emit.
    pub fn emits<M: Payload>(mut self) -> Self {
        let ty = MessageType::of::<M>();
        if !self.emits.contains(&ty) {
            self.emits.push(ty);
        }
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared emission set, in declaration order.
    pub fn declared_emissions(&self) -> &[MessageType] {
        &self.emits
    }

    /// Whether `ty` is in the declared emission set.
    pub fn may_emit(&self, ty: MessageType) -> bool {
        self.emits.contains(&ty)
    }

    /// Evaluate the predicate.
    pub fn enabled(&self, ctx: &ActionContext<'_>, state: &S) -> bool {
        (self.pred)(ctx, state)
    }

    /// Run the effect, producing the messages to route.
    pub fn fire(&self, ctx: &ActionContext<'_>, state: &mut S) -> Outbox {
        (self.act)(ctx, state)
    }
}

impl<S> Clone for OutputAction<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            emits: self.emits.clone(),
            pred: Arc::clone(&self.pred),
            act: Arc::clone(&self.act),
        }
    }
}

impl<S> fmt::Debug for OutputAction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputAction")
            .field("name", &self.name)
            .field(
                "emits",
                &self.emits.iter().map(|t| t.short_name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Steps local state when its predicate holds; emits nothing.
pub struct InternalAction<S> {
    name: &'static str,
    pred: Predicate<S>,
    act: InternalEffect<S>,
}

impl<S: State> InternalAction<S> {
    /// An internal action from a predicate and an effect.
    pub fn new<P, F>(name: &'static str, pred: P, act: F) -> Self
    where
        P: Fn(&ActionContext<'_>, &S) -> bool + Send + Sync + 'static,
        F: Fn(&ActionContext<'_>, &mut S) + Send + Sync + 'static,
    {
        Self {
            name,
            pred: Arc::new(pred),
            act: Arc::new(act),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Evaluate the predicate.
    pub fn enabled(&self, ctx: &ActionContext<'_>, state: &S) -> bool {
        (self.pred)(ctx, state)
    }

    /// Run the effect.
    pub fn fire(&self, ctx: &ActionContext<'_>, state: &mut S) {
        (self.act)(ctx, state);
    }
}

impl<S> Clone for InternalAction<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            pred: Arc::clone(&self.pred),
            act: Arc::clone(&self.act),
        }
    }
}

impl<S> fmt::Debug for InternalAction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalAction")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioa_types::{ExternalUserId, NodeIndex, Sender, Topology};

    #[derive(Debug, Default)]
    struct Counter {
        count: u64,
        last_sender: Option<Sender>,
    }

    #[derive(Debug)]
    struct Bump {
        by: u64,
    }

    #[derive(Debug)]
    struct Tick;

    fn solo() -> Topology {
        Topology::from_matrix(&[vec![true]]).unwrap()
    }

    #[test]
    fn test_input_action_delivers() {
        let action: InputAction<Counter> =
            InputAction::new::<Bump, _>("bump", |ctx, state: &mut Counter, msg| {
                state.count += msg.by;
                state.last_sender = ctx.sender().ok();
            });

        assert_eq!(action.binds(), MessageType::of::<Bump>());

        let topo = solo();
        let ctx = ActionContext::for_input(
            &topo,
            NodeIndex(0),
            ExternalUserId(0),
            Sender::Node(NodeIndex(0)),
        );
        let mut state = Counter::default();
        action.deliver(&ctx, &mut state, &Message::new(Bump { by: 3 }));

        assert_eq!(state.count, 3);
        assert_eq!(state.last_sender, Some(Sender::Node(NodeIndex(0))));
    }

    #[test]
    fn test_output_action_gates_on_predicate() {
        let action: OutputAction<Counter> = OutputAction::new(
            "tick",
            |_ctx, state: &Counter| state.count > 0,
            |_ctx, state| {
                state.count -= 1;
                Outbox::single(Tick, NodeIndex(0))
            },
        )
        .emits::<Tick>();

        let topo = solo();
        let ctx = ActionContext::for_output(&topo, NodeIndex(0), ExternalUserId(0));

        let mut state = Counter::default();
        assert!(!action.enabled(&ctx, &state));

        state.count = 2;
        assert!(action.enabled(&ctx, &state));

        let outbox = action.fire(&ctx, &mut state);
        assert_eq!(state.count, 1);
        assert_eq!(outbox.len(), 1);
        assert!(action.may_emit(MessageType::of::<Tick>()));
        assert!(!action.may_emit(MessageType::of::<Bump>()));
    }

    #[test]
    fn test_emission_declarations_dedup() {
        let action: OutputAction<Counter> =
            OutputAction::new("noop", |_, _: &Counter| false, |_, _| Outbox::new())
                .emits::<Tick>()
                .emits::<Tick>()
                .emits::<Bump>();

        assert_eq!(
            action.declared_emissions(),
            &[MessageType::of::<Tick>(), MessageType::of::<Bump>()]
        );
    }

    #[test]
    fn test_internal_action() {
        let action: InternalAction<Counter> = InternalAction::new(
            "decay",
            |_ctx, state: &Counter| state.count > 10,
            |_ctx, state| state.count = 0,
        );

        let topo = solo();
        let ctx = ActionContext::for_internal(&topo, NodeIndex(0), ExternalUserId(0));

        let mut state = Counter { count: 11, last_sender: None };
        assert!(action.enabled(&ctx, &state));
        action.fire(&ctx, &mut state);
        assert_eq!(state.count, 0);
        assert!(!action.enabled(&ctx, &state));
    }
}
