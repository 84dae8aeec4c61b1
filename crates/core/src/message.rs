//! Tagged, type-erased message values.
//!
//! Payloads are plain user structs. The runtime representation of "a value
//! of one of the declared types" is a [`Message`]: a [`MessageType`] tag
//! plus a shared, erased payload. Catalog membership is enforced by
//! signature validation and re-checked at the engine boundaries (injection
//! and emission), never assumed from the representation.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Bound for types that may appear in a message alphabet.
///
/// Blanket-implemented; any `'static` sendable `Debug` struct qualifies.
pub trait Payload: Any + Send + Sync + fmt::Debug {}

impl<T: Any + Send + Sync + fmt::Debug> Payload for T {}

/// Object-safe carrier so an erased payload stays debuggable.
trait ErasedPayload: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync + fmt::Debug> ErasedPayload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Runtime tag identifying one concrete payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    /// The tag for payload type `M`.
    pub fn of<M: Payload>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
        }
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with the module path stripped.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A message value: type tag plus shared payload.
///
/// Cloning shares the payload (`Arc`), so multi-destination sends never
/// duplicate the value itself.
#[derive(Clone)]
pub struct Message {
    ty: MessageType,
    body: Arc<dyn ErasedPayload>,
}

impl Message {
    /// Wrap a payload value.
    pub fn new<M: Payload>(body: M) -> Self {
        Self {
            ty: MessageType::of::<M>(),
            body: Arc::new(body),
        }
    }

    /// The tag of the wrapped payload.
    pub fn message_type(&self) -> MessageType {
        self.ty
    }

    /// Short name of the payload type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.ty.short_name()
    }

    /// Whether the payload is of type `M`.
    pub fn is<M: Payload>(&self) -> bool {
        self.ty == MessageType::of::<M>()
    }

    /// Borrow the payload as `M`, if that is its type.
    pub fn downcast_ref<M: Payload>(&self) -> Option<&M> {
        self.body.as_any().downcast_ref::<M>()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.body, f)
    }
}
