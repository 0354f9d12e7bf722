//! msgpipe CLI entry point.
//!
//! Binary name: `msgpipe`
//!
//! Parses CLI arguments, sets up tracing, loads `msgpipe.toml`, then
//! dispatches to the command handler.

mod cli;
mod demo;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use msgpipe_infra::config::{default_config_dir, try_load_config};
use msgpipe_observe::tracing_setup::{init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "msgpipe", &mut std::io::stdout());
        return Ok(());
    }

    let config_dir = cli.config_dir.clone().or_else(default_config_dir);

    // The config file may turn on trace export, so peek at it before the
    // subscriber exists. Load errors are reported once tracing is up.
    let enable_otel = match &config_dir {
        Some(dir) => try_load_config(dir)
            .await
            .map(|config| config.enable_otel)
            .unwrap_or(false),
        None => false,
    };

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,msgpipe_core=debug,msgpipe_infra=debug,msgpipe_api=debug",
        _ => "trace",
    };
    init_tracing(filter, cli.otel || enable_otel)
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))?;

    let state = AppState::init(config_dir).await;

    let result = match cli.command {
        Commands::Counter {
            limit,
            buffered,
            tick_ms,
        } => cli::counter::run_counter(&state, limit, buffered, tick_ms, cli.json, cli.quiet).await,

        Commands::Config => cli::config::show_config(&state, cli.json),

        Commands::Completions { .. } => unreachable!("handled above"),
    };

    shutdown_tracing();
    result
}
