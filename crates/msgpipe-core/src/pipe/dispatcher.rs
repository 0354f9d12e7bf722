//! Fan-out delivery of a single envelope.
//!
//! For every distinct target scope among current registrations, in
//! first-registered order, the dispatcher stamps that scope onto the
//! envelope and delivers it to every registration that matches. A wildcard
//! receiver therefore sees the envelope once per step, each time tagged with
//! that step's scope.

use std::sync::Arc;

use msgpipe_types::{DeliveryError, Envelope};
use tracing::{debug, trace};

use super::registry::Registry;

/// What one `publish` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Fan-out steps run (one per distinct registered scope).
    pub steps: usize,
    /// Receiver callbacks invoked across all steps.
    pub deliveries: usize,
}

impl DeliveryReport {
    /// No receivers were registered, so the envelope was dropped.
    pub fn dropped(&self) -> bool {
        self.steps == 0
    }
}

pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Fan `envelope` out to every matching registration.
    ///
    /// The envelope's target scope is left at the value of the last step.
    /// A receiver returning `Err` abandons the current step and all remaining
    /// steps; the error is returned to the caller. Panics are not caught.
    pub fn publish(&self, envelope: &mut Envelope) -> Result<DeliveryReport, DeliveryError> {
        let scopes = self.registry.distinct_target_scopes();
        if scopes.is_empty() {
            debug!(
                kind = %envelope.kind(),
                id = %envelope.id,
                "no receivers registered, envelope dropped"
            );
            return Ok(DeliveryReport::default());
        }

        let mut report = DeliveryReport::default();
        for scope in scopes {
            envelope.set_target_scope(scope);
            report.deliveries += self.deliver(envelope)?;
            report.steps += 1;
        }

        debug!(
            kind = %envelope.kind(),
            id = %envelope.id,
            steps = report.steps,
            deliveries = report.deliveries,
            "published envelope"
        );
        Ok(report)
    }

    /// One fan-out step against a fresh registry snapshot.
    fn deliver(&self, envelope: &Envelope) -> Result<usize, DeliveryError> {
        let snapshot = self.registry.snapshot();
        let mut delivered = 0;

        for registration in snapshot.iter().filter(|r| r.matches(envelope)) {
            trace!(
                receiver = %registration.handle(),
                kind = %envelope.kind(),
                scope = ?envelope.target_scope(),
                "delivering envelope"
            );
            registration
                .invoke(envelope)
                .map_err(|source| DeliveryError {
                    receiver: registration.handle().clone(),
                    scope: envelope.target_scope().map(str::to_owned),
                    source,
                })?;
            delivered += 1;
        }

        Ok(delivered)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("receivers", &self.registry.len())
            .finish()
    }
}
