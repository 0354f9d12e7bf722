//! Deferred (buffered) send path.
//!
//! Buffered envelopes queue up in an outbound buffer. A one-shot tick is armed
//! on the host whenever the buffer gains work and nothing is armed or in
//! flight. Each tick pops exactly one envelope and publishes it on the host's
//! detached context; when that finishes the tick is re-armed if more work is
//! waiting. Throughput is one envelope per tick and the sender never waits on
//! a receiver.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use msgpipe_types::Envelope;
use tracing::{debug, error, warn};

use super::dispatcher::Dispatcher;
use super::host::TickHost;

/// Delay between deferred-send ticks when none is configured.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct OutboundState {
    buffer: VecDeque<Envelope>,
    /// A tick is scheduled on the host and has not fired yet.
    armed: bool,
    /// A popped envelope is being published.
    in_flight: bool,
}

struct Inner {
    dispatcher: Arc<Dispatcher>,
    host: Arc<dyn TickHost>,
    interval: Duration,
    state: Mutex<OutboundState>,
}

/// Outbound buffer drained one envelope per tick.
#[derive(Clone)]
pub struct DeferredScheduler {
    inner: Arc<Inner>,
}

impl DeferredScheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, host: Arc<dyn TickHost>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                dispatcher,
                host,
                interval,
                state: Mutex::new(OutboundState::default()),
            }),
        }
    }

    /// Append to the outbound buffer and arm a tick if none is pending.
    ///
    /// Returns the number of envelopes waiting, including this one.
    pub fn enqueue(&self, envelope: Envelope) -> usize {
        let (pending, arm) = {
            let mut state = self.inner.lock_state();
            state.buffer.push_back(envelope);
            let arm = !state.armed && !state.in_flight;
            if arm {
                state.armed = true;
            }
            (state.buffer.len(), arm)
        };

        if arm {
            self.inner.arm();
        }
        pending
    }

    /// Envelopes buffered but not yet popped by a tick.
    pub fn pending(&self) -> usize {
        self.inner.lock_state().buffer.len()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl Inner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, OutboundState> {
        self.state.lock().expect("outbound buffer lock poisoned")
    }

    fn arm(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.host.schedule_once(
            self.interval,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_tick();
                }
            }),
        );
    }

    fn on_tick(self: &Arc<Self>) {
        {
            let mut state = self.lock_state();
            state.armed = false;
            if state.buffer.is_empty() {
                return;
            }
            state.in_flight = true;
        }

        let job = Arc::clone(self);
        let done = Arc::clone(self);
        self.host.run_detached(
            Box::new(move || job.deliver_next()),
            Box::new(move |completed: bool| done.on_delivered(completed)),
        );
    }

    fn deliver_next(&self) {
        let next = self.lock_state().buffer.pop_front();
        let Some(mut envelope) = next else {
            return;
        };

        match self.dispatcher.publish(&mut envelope) {
            Ok(report) => debug!(
                id = %envelope.id,
                deliveries = report.deliveries,
                "buffered envelope delivered"
            ),
            Err(err) => warn!(id = %envelope.id, error = %err, "buffered delivery failed"),
        }
    }

    fn on_delivered(self: &Arc<Self>, completed: bool) {
        if !completed {
            error!("receiver panicked during buffered delivery; continuing with next envelope");
        }

        let rearm = {
            let mut state = self.lock_state();
            state.in_flight = false;
            let rearm = !state.buffer.is_empty() && !state.armed;
            if rearm {
                state.armed = true;
            }
            rearm
        };

        if rearm {
            self.arm();
        }
    }
}

impl std::fmt::Debug for DeferredScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("DeferredScheduler")
            .field("interval", &self.inner.interval)
            .field("pending", &state.buffer.len())
            .field("armed", &state.armed)
            .field("in_flight", &state.in_flight)
            .finish()
    }
}
