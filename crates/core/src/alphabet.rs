//! Input and output type catalogs.

use crate::message::{MessageType, Payload};
use tracing::warn;

/// The message alphabet of an automaton: which payload types it consumes
/// (input catalog) and which it may emit (output catalog).
///
/// Catalogs are ordered by declaration and duplicate-free. A type may appear
/// in both catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alphabet {
    inputs: Vec<MessageType>,
    outputs: Vec<MessageType>,
}

impl Alphabet {
    /// Start declaring an alphabet.
    pub fn builder() -> AlphabetBuilder {
        AlphabetBuilder::default()
    }

    /// Whether `ty` is in the input catalog.
    pub fn is_input(&self, ty: MessageType) -> bool {
        self.inputs.contains(&ty)
    }

    /// Whether `ty` is in the output catalog.
    pub fn is_output(&self, ty: MessageType) -> bool {
        self.outputs.contains(&ty)
    }

    /// Input catalog in declaration order.
    pub fn input_types(&self) -> &[MessageType] {
        &self.inputs
    }

    /// Output catalog in declaration order.
    pub fn output_types(&self) -> &[MessageType] {
        &self.outputs
    }

    /// Whether both catalogs are contained in `other`'s.
    ///
    /// Accepting a subset alphabet where a superset is expected is the one
    /// sanctioned widening; there is no implicit coercion anywhere else.
    pub fn is_subset_of(&self, other: &Alphabet) -> bool {
        self.inputs.iter().all(|ty| other.is_input(*ty))
            && self.outputs.iter().all(|ty| other.is_output(*ty))
    }
}

/// Builder collecting catalog declarations.
#[derive(Debug, Clone, Default)]
pub struct AlphabetBuilder {
    inputs: Vec<MessageType>,
    outputs: Vec<MessageType>,
}

impl AlphabetBuilder {
    /// Declare `M` as an input type. Repeat declarations are ignored.
    pub fn input<M: Payload>(mut self) -> Self {
        let ty = MessageType::of::<M>();
        if !self.inputs.contains(&ty) {
            self.inputs.push(ty);
        }
        self
    }

    /// Declare `M` as an output type. Repeat declarations are ignored.
    pub fn output<M: Payload>(mut self) -> Self {
        let ty = MessageType::of::<M>();
        if !self.outputs.contains(&ty) {
            self.outputs.push(ty);
        }
        self
    }

    /// Finish the alphabet.
    ///
    /// An empty catalog side is legal (a source-only or sink-only
    /// automaton) but worth flagging.
    pub fn build(self) -> Alphabet {
        if self.inputs.is_empty() {
            warn!("alphabet has an empty input catalog; nothing can be delivered to this automaton");
        }
        if self.outputs.is_empty() {
            warn!("alphabet has an empty output catalog; this automaton cannot emit messages");
        }
        Alphabet {
            inputs: self.inputs,
            outputs: self.outputs,
        }
    }
}
