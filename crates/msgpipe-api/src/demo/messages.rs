//! Payloads exchanged by the counter demo.

use msgpipe_types::EnvelopeKind;
use serde::Serialize;

/// The producer is about to start counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterStarted;

/// The counter moved to `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterChanged {
    pub value: u32,
}

/// The producer stopped at `final_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterFinished {
    pub final_value: u32,
}

/// Every kind the counter emits.
pub fn counter_kinds() -> [EnvelopeKind; 3] {
    [
        EnvelopeKind::of::<CounterStarted>(),
        EnvelopeKind::of::<CounterChanged>(),
        EnvelopeKind::of::<CounterFinished>(),
    ]
}
