//! Tokio-backed [`TickHost`].
//!
//! Ticks are `tokio::time::sleep` tasks on the runtime; detached jobs run on
//! the blocking pool because receiver callbacks are synchronous and may be
//! slow. A panicking job is reported to the scheduler as incomplete instead
//! of taking the runtime down.

use std::time::Duration;

use msgpipe_core::pipe::host::{Completion, Task, TickHost};
use tokio::runtime::Handle;

/// Runs pipe ticks and deliveries on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioHost {
    handle: Handle,
}

impl TokioHost {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime the caller is running on.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl TickHost for TokioHost {
    fn schedule_once(&self, delay: Duration, tick: Task) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            tick();
        });
    }

    fn run_detached(&self, job: Task, done: Completion) {
        let delivery = self.handle.spawn_blocking(job);
        self.handle.spawn(async move {
            let completed = match delivery.await {
                Ok(()) => true,
                Err(err) => {
                    tracing::error!(error = %err, "detached delivery did not complete");
                    false
                }
            };
            done(completed);
        });
    }
}
