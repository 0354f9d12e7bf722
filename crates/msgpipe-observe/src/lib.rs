//! Observability setup for msgpipe binaries.

pub mod tracing_setup;
