//! Receiver side of the counter demo.
//!
//! A `CounterMonitor` owns one receiver covering all counter kinds and keeps a
//! tally of what it saw. Detaching removes every receiver it owns in one call.

use std::sync::{Arc, Mutex};

use msgpipe_core::pipe::MessagePipe;
use msgpipe_types::{Envelope, OwnerId, ReceiverError, ReceiverHandle};
use serde::Serialize;

use super::messages::{counter_kinds, CounterChanged, CounterFinished, CounterStarted};

/// What a monitor observed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub started: bool,
    pub changes: u32,
    pub last_value: Option<u32>,
    pub final_value: Option<u32>,
}

impl MonitorStats {
    pub fn finished(&self) -> bool {
        self.final_value.is_some()
    }
}

/// Owner of the demo receiver.
#[derive(Debug, Clone)]
pub struct CounterMonitor {
    owner: OwnerId,
    echo: bool,
    stats: Arc<Mutex<MonitorStats>>,
}

impl CounterMonitor {
    /// `echo` prints each envelope to stdout as it arrives.
    pub fn new(echo: bool) -> Self {
        Self {
            owner: OwnerId::new(),
            echo,
            stats: Arc::new(Mutex::new(MonitorStats::default())),
        }
    }

    pub fn handle(&self) -> ReceiverHandle {
        self.owner.handle("on_counter")
    }

    /// Register for every counter kind, with no target scope.
    ///
    /// Returns `false` if this monitor is already attached.
    pub fn attach(&self, pipe: &MessagePipe) -> bool {
        let stats = Arc::clone(&self.stats);
        let echo = self.echo;
        pipe.register_receiver(self.handle(), counter_kinds(), None, move |env: &Envelope| {
            on_counter(&stats, echo, env)
        })
    }

    /// Remove every receiver this monitor owns.
    pub fn detach(&self, pipe: &MessagePipe) -> usize {
        pipe.unregister_owner(self.owner)
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats.lock().expect("monitor stats lock poisoned").clone()
    }
}

fn on_counter(
    stats: &Mutex<MonitorStats>,
    echo: bool,
    env: &Envelope,
) -> Result<(), ReceiverError> {
    let mut stats = stats.lock().expect("monitor stats lock poisoned");

    if env.is::<CounterStarted>() {
        stats.started = true;
        tracing::info!("counter started");
        if echo {
            println!("  {}", console::style("counter started").dim());
        }
    } else if let Some(CounterChanged { value }) = env.payload::<CounterChanged>() {
        stats.changes += 1;
        stats.last_value = Some(*value);
        tracing::trace!(value, "counter changed");
        if echo {
            println!("  counter changed: {}", console::style(value).cyan());
        }
    } else if let Some(CounterFinished { final_value }) = env.payload::<CounterFinished>() {
        stats.final_value = Some(*final_value);
        tracing::info!(final_value, "counter finished");
        if echo {
            println!(
                "  {} counter finished at {}",
                console::style("✓").green(),
                console::style(final_value).bold()
            );
        }
    } else {
        return Err(ReceiverError::rejected(format!(
            "unexpected envelope kind {}",
            env.kind()
        )));
    }

    Ok(())
}
