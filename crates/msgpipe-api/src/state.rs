//! Application state shared by the CLI commands.
//!
//! Holds the resolved configuration and builds pipes bound to the current
//! tokio runtime.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use msgpipe_core::pipe::MessagePipe;
use msgpipe_infra::config::{resolve_tick_interval, try_load_config};
use msgpipe_infra::TokioHost;
use msgpipe_types::config::PipeConfig;

pub struct AppState {
    pub config: PipeConfig,
    /// Directory `msgpipe.toml` was looked up in, if any.
    pub config_dir: Option<PathBuf>,
}

impl AppState {
    /// Load configuration from `config_dir`, falling back to defaults when the
    /// file is malformed.
    pub async fn init(config_dir: Option<PathBuf>) -> Self {
        let config = match &config_dir {
            Some(dir) => try_load_config(dir).await.unwrap_or_else(|err| {
                tracing::warn!("{err}, using defaults");
                PipeConfig::default()
            }),
            None => PipeConfig::default(),
        };
        Self { config, config_dir }
    }

    pub fn tick_interval(&self, override_ms: Option<u64>) -> Duration {
        resolve_tick_interval(&self.config, override_ms)
    }

    /// A fresh pipe whose deferred path ticks on the current runtime.
    pub fn pipe(&self, tick_override_ms: Option<u64>) -> anyhow::Result<MessagePipe> {
        let host = TokioHost::try_current().context("msgpipe must run inside a tokio runtime")?;
        Ok(MessagePipe::new(
            Arc::new(host),
            self.tick_interval(tick_override_ms),
        ))
    }
}
