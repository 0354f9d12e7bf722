//! Execution capabilities the pipe needs from its host.
//!
//! The deferred send path only needs two things from whatever event loop it
//! runs inside: a one-shot delayed callback and a way to run work off the
//! caller's context. `TickHost` captures both so the core stays runtime
//! agnostic. `ManualHost` fires ticks on demand and is what the unit tests
//! use; the tokio-backed host lives in `msgpipe-infra`.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::time::Duration;

/// A unit of work handed to the host.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Completion callback for [`TickHost::run_detached`]. Receives `false` if
/// the job panicked.
pub type Completion = Box<dyn FnOnce(bool) + Send + 'static>;

/// Timer and executor abstraction supplied by the hosting application.
pub trait TickHost: Send + Sync + 'static {
    /// Run `tick` once after `delay`.
    fn schedule_once(&self, delay: Duration, tick: Task);

    /// Run `job` away from the caller's context, then report completion.
    ///
    /// `done` must be called exactly once, including when `job` panics.
    fn run_detached(&self, job: Task, done: Completion);
}

/// Host whose ticks only fire when the owner asks.
///
/// `run_detached` executes the job inline on the thread that fired the tick.
#[derive(Default)]
pub struct ManualHost {
    armed: Mutex<VecDeque<(Duration, Task)>>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks scheduled but not yet fired.
    pub fn armed_ticks(&self) -> usize {
        self.armed.lock().expect("manual host lock poisoned").len()
    }

    /// Delay requested by the oldest armed tick.
    pub fn next_delay(&self) -> Option<Duration> {
        self.armed
            .lock()
            .expect("manual host lock poisoned")
            .front()
            .map(|(delay, _)| *delay)
    }

    /// Fire the oldest armed tick. Returns `false` if nothing was armed.
    pub fn fire_next(&self) -> bool {
        let next = self.armed.lock().expect("manual host lock poisoned").pop_front();
        match next {
            Some((_, tick)) => {
                tick();
                true
            }
            None => false,
        }
    }

    /// Fire ticks until none remain or `limit` have fired. Returns the count fired.
    pub fn fire_all(&self, limit: usize) -> usize {
        let mut fired = 0;
        while fired < limit && self.fire_next() {
            fired += 1;
        }
        fired
    }
}

impl TickHost for ManualHost {
    fn schedule_once(&self, delay: Duration, tick: Task) {
        self.armed
            .lock()
            .expect("manual host lock poisoned")
            .push_back((delay, tick));
    }

    fn run_detached(&self, job: Task, done: Completion) {
        let completed = panic::catch_unwind(AssertUnwindSafe(job)).is_ok();
        done(completed);
    }
}

impl std::fmt::Debug for ManualHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualHost")
            .field("armed_ticks", &self.armed_ticks())
            .finish()
    }
}
