//! In-process message pipe with scoped fan-out and deferred sends.
//!
//! - `registry` -- `Registry` of receiver registrations with snapshot reads
//! - `dispatcher` -- `Dispatcher` fanning one envelope out per distinct scope
//! - `scheduler` -- `DeferredScheduler` draining buffered envelopes one per tick
//! - `host` -- `TickHost` capability trait and the on-demand `ManualHost`
//! - `bus` -- `MessagePipe` facade composing the above

pub mod bus;
pub mod dispatcher;
pub mod host;
pub mod registry;
pub mod scheduler;

pub use bus::{MessagePipe, SendOutcome};
pub use dispatcher::{DeliveryReport, Dispatcher};
pub use host::{ManualHost, TickHost};
pub use registry::Registry;
pub use scheduler::{DEFAULT_TICK_INTERVAL, DeferredScheduler};
