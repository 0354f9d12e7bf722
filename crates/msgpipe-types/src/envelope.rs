//! Envelope data model for the message pipe.
//!
//! An `Envelope` wraps an arbitrary payload value. The payload's Rust type is
//! the envelope's kind, which is what receivers filter on. The set of kinds is
//! open: any `'static + Send + Sync + Debug` type can be published.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Marker for types that can travel through the pipe as an envelope payload.
///
/// Blanket-implemented for every eligible type; there is nothing to derive.
pub trait Payload: Any + Send + Sync + fmt::Debug {}

impl<T: Any + Send + Sync + fmt::Debug> Payload for T {}

/// Discriminator used to match envelopes against receiver filters.
///
/// Equality and hashing use the payload's `TypeId` only; the type name is
/// carried for logging.
#[derive(Clone, Copy)]
pub struct EnvelopeKind {
    type_id: TypeId,
    name: &'static str,
}

impl EnvelopeKind {
    /// The kind of envelopes carrying a `P` payload.
    pub fn of<P: Payload>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            name: std::any::type_name::<P>(),
        }
    }

    /// Fully qualified type name of the payload.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path (e.g. `CounterChanged`).
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for EnvelopeKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EnvelopeKind {}

impl Hash for EnvelopeKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnvelopeKind").field(&self.name).finish()
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A published message.
///
/// `target_scope` is mutable: while an envelope is being fanned out the
/// dispatcher overwrites it once per distinct registered scope, so a receiver
/// always sees the scope of the step it is being called for. Producers hand
/// the envelope over by value and never observe it again.
pub struct Envelope {
    /// UUIDv7 envelope ID.
    pub id: Uuid,
    /// When the envelope was created.
    pub created_at: DateTime<Utc>,
    kind: EnvelopeKind,
    target_scope: Option<String>,
    can_buffer: bool,
    payload: Box<dyn Any + Send + Sync>,
    describe: fn(&(dyn Any + Send + Sync), &mut fmt::Formatter<'_>) -> fmt::Result,
}

impl Envelope {
    /// Wrap a payload in an unscoped, unbuffered envelope.
    pub fn new<P: Payload>(payload: P) -> Self {
        Self {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            kind: EnvelopeKind::of::<P>(),
            target_scope: None,
            can_buffer: false,
            payload: Box::new(payload),
            describe: describe_payload::<P>,
        }
    }

    /// Scope the envelope to a named target.
    pub fn with_target_scope(mut self, scope: impl Into<String>) -> Self {
        self.target_scope = Some(scope.into());
        self
    }

    /// Route the envelope through the deferred (buffered) send path.
    pub fn buffered(mut self) -> Self {
        self.can_buffer = true;
        self
    }

    pub fn kind(&self) -> EnvelopeKind {
        self.kind
    }

    /// Whether this envelope carries a payload of type `P`.
    pub fn is<P: Payload>(&self) -> bool {
        self.kind == EnvelopeKind::of::<P>()
    }

    /// Borrow the payload as `P`, or `None` if the envelope is another kind.
    pub fn payload<P: Payload>(&self) -> Option<&P> {
        self.payload.downcast_ref::<P>()
    }

    pub fn target_scope(&self) -> Option<&str> {
        self.target_scope.as_deref()
    }

    /// Overwrite the target scope. Used by the dispatcher during fan-out.
    pub fn set_target_scope(&mut self, scope: Option<String>) {
        self.target_scope = scope;
    }

    pub fn can_buffer(&self) -> bool {
        self.can_buffer
    }

    pub fn set_can_buffer(&mut self, can_buffer: bool) {
        self.can_buffer = can_buffer;
    }
}

fn describe_payload<P: Payload>(
    payload: &(dyn Any + Send + Sync),
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    match payload.downcast_ref::<P>() {
        Some(p) => fmt::Debug::fmt(p, f),
        None => f.write_str("<unknown>"),
    }
}

struct PayloadDebug<'a>(&'a Envelope);

impl fmt::Debug for PayloadDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0.describe)(self.0.payload.as_ref(), f)
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("target_scope", &self.target_scope)
            .field("can_buffer", &self.can_buffer)
            .field("payload", &PayloadDebug(self))
            .finish()
    }
}
