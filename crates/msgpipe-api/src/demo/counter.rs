//! Counter producer.
//!
//! Announces the start, sends one `CounterChanged` per step and announces the
//! final value. With `buffered` set every envelope goes through the deferred
//! path instead of being delivered inline.

use msgpipe_core::pipe::{MessagePipe, SendOutcome};
use msgpipe_types::{DeliveryError, Envelope, Payload};
use serde::Serialize;

use super::messages::{CounterChanged, CounterFinished, CounterStarted};

/// Totals for one producer run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterRun {
    /// Envelopes handed to the pipe.
    pub sent: u32,
    /// Receiver invocations from inline sends.
    pub delivered: usize,
    /// Inline sends that reached nobody.
    pub dropped: u32,
    /// Sends queued on the deferred path.
    pub buffered: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Counter {
    limit: u32,
    buffered: bool,
}

impl Counter {
    pub fn new(limit: u32, buffered: bool) -> Self {
        Self { limit, buffered }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Send the full sequence on `pipe`.
    ///
    /// Stops at the first inline delivery failure.
    #[tracing::instrument(skip(self, pipe), fields(limit = self.limit, buffered = self.buffered))]
    pub fn run(&self, pipe: &MessagePipe) -> Result<CounterRun, DeliveryError> {
        let mut run = CounterRun::default();

        self.emit(pipe, CounterStarted, &mut run)?;
        for value in 0..self.limit {
            self.emit(pipe, CounterChanged { value }, &mut run)?;
        }
        self.emit(
            pipe,
            CounterFinished {
                final_value: self.limit,
            },
            &mut run,
        )?;

        tracing::debug!(sent = run.sent, delivered = run.delivered, "counter run finished");
        Ok(run)
    }

    fn emit<P: Payload>(
        &self,
        pipe: &MessagePipe,
        payload: P,
        run: &mut CounterRun,
    ) -> Result<(), DeliveryError> {
        let mut envelope = Envelope::new(payload);
        envelope.set_can_buffer(self.buffered);

        match pipe.send(envelope)? {
            SendOutcome::Delivered(report) => {
                run.delivered += report.deliveries;
                if report.dropped() {
                    run.dropped += 1;
                }
            }
            SendOutcome::Buffered { .. } => run.buffered += 1,
        }
        run.sent += 1;
        Ok(())
    }
}
