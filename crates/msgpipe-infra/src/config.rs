//! Configuration loader for msgpipe.
//!
//! Reads `msgpipe.toml` from the config directory (`~/.config/msgpipe/` on
//! Linux) and deserializes it into [`PipeConfig`]. A missing file yields the
//! defaults; a malformed one is reported so the caller can log it and fall
//! back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use msgpipe_types::config::PipeConfig;
use msgpipe_types::error::ConfigError;

/// File name looked up inside the config directory.
pub const CONFIG_FILE: &str = "msgpipe.toml";

/// Smallest tick interval accepted (safety floor).
const MIN_TICK_INTERVAL_MS: u64 = 1;

/// Platform config directory for msgpipe, if one exists.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("msgpipe"))
}

/// Load `{config_dir}/msgpipe.toml`, reporting read and parse failures.
///
/// A missing file is not an error and yields [`PipeConfig::default()`].
pub async fn try_load_config(config_dir: &Path) -> Result<PipeConfig, ConfigError> {
    let config_path = config_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE} found at {}, using defaults", config_path.display());
            return Ok(PipeConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: config_path.display().to_string(),
                reason: err.to_string(),
            });
        }
    };

    toml::from_str::<PipeConfig>(&content).map_err(|err| ConfigError::Parse {
        path: config_path.display().to_string(),
        reason: err.to_string(),
    })
}

/// Resolve the deferred-send tick interval.
///
/// Priority:
/// 1. Command-line override
/// 2. `tick_interval_ms` from `msgpipe.toml`
///
/// A floor of 1 ms is enforced regardless of source.
pub fn resolve_tick_interval(config: &PipeConfig, override_ms: Option<u64>) -> Duration {
    let ms = override_ms.unwrap_or(config.tick_interval_ms);
    Duration::from_millis(ms.max(MIN_TICK_INTERVAL_MS))
}
