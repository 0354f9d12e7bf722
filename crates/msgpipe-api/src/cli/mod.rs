//! CLI command definitions for the `msgpipe` binary.

pub mod config;
pub mod counter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Drive the in-process message pipe from the command line.
#[derive(Parser)]
#[command(name = "msgpipe", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Directory containing msgpipe.toml.
    #[arg(long, global = true, env = "MSGPIPE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the counter demo through the pipe.
    Counter {
        /// Number of CounterChanged envelopes (defaults to [demo] counter_limit).
        #[arg(long)]
        limit: Option<u32>,

        /// Send every envelope through the deferred path.
        #[arg(long)]
        buffered: bool,

        /// Override the deferred-send tick interval in milliseconds.
        #[arg(long)]
        tick_ms: Option<u64>,
    },

    /// Show the effective configuration.
    Config,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
