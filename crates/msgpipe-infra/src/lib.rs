//! Infrastructure layer for msgpipe.
//!
//! Provides the tokio implementation of the `TickHost` capability defined in
//! `msgpipe-core`, and loads `msgpipe.toml` from disk.

pub mod config;
pub mod host;

pub use host::TokioHost;
