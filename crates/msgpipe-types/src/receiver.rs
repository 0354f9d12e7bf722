//! Receiver identity types.
//!
//! A receiver is identified by the owner that registered it plus the name of
//! the callback within that owner. Owners keep their `OwnerId` and use it to
//! drop every receiver they registered in one call.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an object that owns one or more receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Allocate a fresh owner identity (UUIDv7).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Build the handle for a named callback owned by this owner.
    pub fn handle(&self, callback: impl Into<Cow<'static, str>>) -> ReceiverHandle {
        ReceiverHandle {
            owner: *self,
            callback: callback.into(),
        }
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a single registration: `(owner, callback name)`.
///
/// Registering the same handle twice is a no-op, and unregistering by handle
/// removes at most one registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiverHandle {
    pub owner: OwnerId,
    pub callback: Cow<'static, str>,
}

impl ReceiverHandle {
    pub fn belongs_to(&self, owner: OwnerId) -> bool {
        self.owner == owner
    }
}

impl fmt::Display for ReceiverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.callback)
    }
}
