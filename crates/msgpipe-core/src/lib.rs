//! Dispatch engine for msgpipe.
//!
//! Holds the receiver registry, the fan-out dispatcher, and the deferred send
//! scheduler. The crate depends only on `msgpipe-types`; timers and detached
//! execution come from a `TickHost` supplied by the caller (see
//! `msgpipe-infra` for the tokio implementation).

pub mod pipe;
