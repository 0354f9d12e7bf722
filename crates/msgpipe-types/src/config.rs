//! Configuration types for msgpipe.
//!
//! `PipeConfig` represents `msgpipe.toml`, which controls the deferred send
//! tick rate, trace export, and the demo producer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `{config_dir}/msgpipe.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeConfig {
    /// Delay between deferred-send ticks, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Bridge tracing spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub enable_otel: bool,

    #[serde(default)]
    pub demo: DemoConfig,
}

fn default_tick_interval_ms() -> u64 {
    100
}

impl PipeConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            enable_otel: false,
            demo: DemoConfig::default(),
        }
    }
}

/// Settings for the counter demo producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Number of `CounterChanged` envelopes sent per run.
    #[serde(default = "default_counter_limit")]
    pub counter_limit: u32,
}

fn default_counter_limit() -> u32 {
    100
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            counter_limit: default_counter_limit(),
        }
    }
}
