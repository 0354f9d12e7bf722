//! Shared domain types for msgpipe.
//!
//! Envelopes and their kinds, receiver identities, configuration, and the
//! error types shared by the core and infrastructure crates.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod envelope;
pub mod error;
pub mod receiver;

pub use envelope::{Envelope, EnvelopeKind, Payload};
pub use error::{DeliveryError, ReceiverError};
pub use receiver::{OwnerId, ReceiverHandle};
