//! `msgpipe counter`: run the counter demo end to end.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use msgpipe_core::pipe::MessagePipe;

use crate::demo::{Counter, CounterMonitor, CounterRun, MonitorStats};
use crate::state::AppState;

/// Extra time allowed on top of one tick per buffered envelope.
const DRAIN_SLACK: Duration = Duration::from_secs(5);

/// Send the counter sequence to a freshly attached monitor and report what
/// arrived.
///
/// Buffered runs wait until the monitor has seen the final envelope.
pub async fn run_counter(
    state: &AppState,
    limit: Option<u32>,
    buffered: bool,
    tick_ms: Option<u64>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let pipe = state.pipe(tick_ms)?;
    let counter = Counter::new(limit.unwrap_or(state.config.demo.counter_limit), buffered);
    let monitor = CounterMonitor::new(!json && !quiet);
    monitor.attach(&pipe);

    let started = Instant::now();
    let run = counter.run(&pipe).context("counter run aborted")?;
    if run.buffered > 0 {
        wait_for_drain(&pipe, &monitor, run.buffered).await?;
    }
    let elapsed = started.elapsed();

    let detached = monitor.detach(&pipe);
    tracing::debug!(detached, "monitor detached");

    let stats = monitor.stats();
    if json {
        let out = serde_json::json!({
            "limit": counter.limit(),
            "buffered": buffered,
            "tick_interval_ms": pipe.tick_interval().as_millis() as u64,
            "elapsed_ms": elapsed.as_millis() as u64,
            "run": run,
            "monitor": stats,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !quiet {
        print_summary(&pipe, &run, &stats, elapsed);
    }

    Ok(())
}

/// Poll until the monitor has seen `CounterFinished`.
async fn wait_for_drain(pipe: &MessagePipe, monitor: &CounterMonitor, queued: u32) -> Result<()> {
    let tick = pipe.tick_interval();
    let deadline = Instant::now() + tick * queued + DRAIN_SLACK;

    while !monitor.stats().finished() {
        if Instant::now() >= deadline {
            bail!(
                "buffered delivery did not finish in time ({} envelopes still pending)",
                pipe.pending()
            );
        }
        tokio::time::sleep(tick).await;
    }
    Ok(())
}

fn print_summary(pipe: &MessagePipe, run: &CounterRun, stats: &MonitorStats, elapsed: Duration) {
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Metric").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);

    let rows: [(&str, String); 7] = [
        ("Envelopes sent", run.sent.to_string()),
        ("Delivered inline", run.delivered.to_string()),
        ("Buffered", run.buffered.to_string()),
        ("Dropped", run.dropped.to_string()),
        ("Changes seen", stats.changes.to_string()),
        (
            "Final value",
            stats
                .final_value
                .map_or_else(|| "-".to_string(), |v| v.to_string()),
        ),
        ("Tick interval", format!("{:?}", pipe.tick_interval())),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name).fg(Color::Cyan), Cell::new(value)]);
    }

    println!("{table}");
    println!(
        "  {} finished in {}",
        style("✓").green(),
        style(format!("{elapsed:.2?}")).dim()
    );
    println!();
}
