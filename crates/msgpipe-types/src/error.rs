use thiserror::Error;

use crate::receiver::ReceiverHandle;

/// Failure reported by a receiver callback.
#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("receiver rejected envelope: {0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ReceiverError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// A receiver failed while an envelope was being fanned out.
///
/// The failing fan-out step and every step after it are abandoned.
#[derive(Debug, Error)]
#[error("delivery to {receiver} failed (scope {scope:?}): {source}")]
pub struct DeliveryError {
    pub receiver: ReceiverHandle,
    pub scope: Option<String>,
    #[source]
    pub source: ReceiverError,
}

/// Errors related to configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}
