//! Counter demo: a producer counting up and a monitor receiving every step.

pub mod counter;
pub mod messages;
pub mod monitor;

pub use counter::{Counter, CounterRun};
pub use monitor::{CounterMonitor, MonitorStats};
