//! Signature: one alphabet plus the three action families, validated.

use crate::action::{InputAction, InternalAction, OutputAction};
use crate::alphabet::Alphabet;
use crate::state::State;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Validation failures. The build stops at the first one; there is no
/// partial signature.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// An input action is bound to a type outside the input catalog.
    #[error("input action '{action}' is bound to {message_type}, which is not a declared input type")]
    NoMatchingInputType {
        action: &'static str,
        message_type: &'static str,
    },

    /// An output action declares an emission outside the output catalog.
    #[error("output action '{action}' may emit {message_type}, which is not a declared output type")]
    OutputTypeNotDeclared {
        action: &'static str,
        message_type: &'static str,
    },
}

/// A validated automaton interface.
///
/// Immutable once built, cheap to clone (actions are shared), and reusable
/// across engines and runs. Every automaton an engine instantiates runs
/// exactly this interface.
pub struct Signature<S> {
    alphabet: Alphabet,
    inputs: Vec<InputAction<S>>,
    outputs: Vec<OutputAction<S>>,
    internals: Vec<InternalAction<S>>,
}

impl<S: State> Signature<S> {
    /// Run the validation pass and build the signature.
    ///
    /// Checks, in order: every input action's bound type against the input
    /// catalog, then every output action's declared emissions against the
    /// output catalog. Returns the first failure found.
    pub fn build(
        alphabet: Alphabet,
        inputs: Vec<InputAction<S>>,
        outputs: Vec<OutputAction<S>>,
        internals: Vec<InternalAction<S>>,
    ) -> Result<Self, ValidationError> {
        for action in &inputs {
            if !alphabet.is_input(action.binds()) {
                return Err(ValidationError::NoMatchingInputType {
                    action: action.name(),
                    message_type: action.binds().short_name(),
                });
            }
        }

        for action in &outputs {
            for &ty in action.declared_emissions() {
                if !alphabet.is_output(ty) {
                    return Err(ValidationError::OutputTypeNotDeclared {
                        action: action.name(),
                        message_type: ty.short_name(),
                    });
                }
            }
        }

        // A declared input type nothing consumes would block its queue at
        // the first delivered message of that type.
        for &ty in alphabet.input_types() {
            if !inputs.iter().any(|a| a.binds() == ty) {
                warn!(
                    message_type = ty.short_name(),
                    "input type has no bound action; a delivered message of this type never leaves its queue"
                );
            }
        }

        Ok(Self {
            alphabet,
            inputs,
            outputs,
            internals,
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn input_actions(&self) -> &[InputAction<S>] {
        &self.inputs
    }

    pub fn output_actions(&self) -> &[OutputAction<S>] {
        &self.outputs
    }

    pub fn internal_actions(&self) -> &[InternalAction<S>] {
        &self.internals
    }

    /// Total action slots across the three families.
    pub fn action_count(&self) -> usize {
        self.inputs.len() + self.outputs.len() + self.internals.len()
    }
}

impl<S> Clone for Signature<S> {
    fn clone(&self) -> Self {
        Self {
            alphabet: self.alphabet.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            internals: self.internals.clone(),
        }
    }
}

impl<S: State> fmt::Debug for Signature<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("inputs", &self.inputs.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("outputs", &self.outputs.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field(
                "internals",
                &self.internals.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::Outbox;

    #[derive(Debug, Default)]
    struct Blank;

    #[derive(Debug)]
    struct Seed;

    #[derive(Debug)]
    struct Rumor;

    #[derive(Debug)]
    struct Stray;

    fn seed_rumor_alphabet() -> Alphabet {
        Alphabet::builder()
            .input::<Seed>()
            .input::<Rumor>()
            .output::<Rumor>()
            .build()
    }

    #[test]
    fn test_valid_signature() {
        let signature = Signature::<Blank>::build(
            seed_rumor_alphabet(),
            vec![
                InputAction::new::<Seed, _>("seed", |_, _, _| {}),
                InputAction::new::<Rumor, _>("hear", |_, _, _| {}),
            ],
            vec![
                OutputAction::new("relay", |_, _: &Blank| false, |_, _| Outbox::new())
                    .emits::<Rumor>(),
            ],
            vec![InternalAction::new("step", |_, _: &Blank| false, |_, _| {})],
        );

        let signature = signature.unwrap();
        assert_eq!(signature.action_count(), 4);
        assert_eq!(signature.input_actions().len(), 2);
    }

    #[test]
    fn test_undeclared_input_type_rejected() {
        let result = Signature::<Blank>::build(
            seed_rumor_alphabet(),
            vec![InputAction::new::<Stray, _>("stray", |_, _, _| {})],
            Vec::new(),
            Vec::new(),
        );

        match result {
            Err(ValidationError::NoMatchingInputType {
                action,
                message_type,
            }) => {
                assert_eq!(action, "stray");
                assert_eq!(message_type, "Stray");
            }
            other => panic!("expected NoMatchingInputType, got {other:?}"),
        }
    }

    #[test]
    fn test_undeclared_output_type_rejected() {
        let result = Signature::<Blank>::build(
            seed_rumor_alphabet(),
            Vec::new(),
            vec![
                OutputAction::new("leak", |_, _: &Blank| false, |_, _| Outbox::new())
                    .emits::<Rumor>()
                    .emits::<Stray>(),
            ],
            Vec::new(),
        );

        match result {
            Err(ValidationError::OutputTypeNotDeclared {
                action,
                message_type,
            }) => {
                assert_eq!(action, "leak");
                assert_eq!(message_type, "Stray");
            }
            other => panic!("expected OutputTypeNotDeclared, got {other:?}"),
        }
    }

    #[test]
    fn test_first_failure_wins() {
        // Both input actions are unbound; the earlier one is reported.
        let result = Signature::<Blank>::build(
            Alphabet::builder().output::<Rumor>().build(),
            vec![
                InputAction::new::<Seed, _>("first", |_, _, _| {}),
                InputAction::new::<Stray, _>("second", |_, _, _| {}),
            ],
            Vec::new(),
            Vec::new(),
        );

        match result {
            Err(ValidationError::NoMatchingInputType { action, .. }) => {
                assert_eq!(action, "first");
            }
            other => panic!("expected NoMatchingInputType, got {other:?}"),
        }
    }

    #[test]
    fn test_input_checks_precede_output_checks() {
        let result = Signature::<Blank>::build(
            Alphabet::builder().input::<Seed>().build(),
            vec![InputAction::new::<Rumor, _>("hear", |_, _, _| {})],
            vec![
                OutputAction::new("leak", |_, _: &Blank| false, |_, _| Outbox::new())
                    .emits::<Stray>(),
            ],
            Vec::new(),
        );

        assert!(matches!(
            result,
            Err(ValidationError::NoMatchingInputType { .. })
        ));
    }

    #[test]
    fn test_signature_is_reusable() {
        let signature = Signature::<Blank>::build(
            seed_rumor_alphabet(),
            vec![InputAction::new::<Seed, _>("seed", |_, _, _| {})],
            Vec::new(),
            Vec::new(),
        )
        .unwrap();

        let copy = signature.clone();
        assert_eq!(copy.action_count(), signature.action_count());
        assert_eq!(
            copy.input_actions()[0].binds(),
            crate::MessageType::of::<Seed>()
        );
    }
}
