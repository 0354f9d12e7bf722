//! Effective configuration display.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use msgpipe_infra::config::CONFIG_FILE;

use crate::state::AppState;

pub fn show_config(state: &AppState, json: bool) -> Result<()> {
    let config_path = state
        .config_dir
        .as_ref()
        .map(|dir| dir.join(CONFIG_FILE).display().to_string());

    if json {
        let out = serde_json::json!({
            "path": config_path,
            "tick_interval_ms": state.tick_interval(None).as_millis() as u64,
            "config": state.config,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} msgpipe v{}",
        style("⚙").bold(),
        env!("CARGO_PKG_VERSION")
    );
    match &config_path {
        Some(path) => println!("  Config: {}", style(path).dim()),
        None => println!("  Config: {}", style("(no config directory)").dim()),
    }
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Setting").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);
    table.add_row(vec![
        Cell::new("tick_interval_ms").fg(Color::Cyan),
        Cell::new(state.tick_interval(None).as_millis()),
    ]);
    table.add_row(vec![
        Cell::new("enable_otel").fg(Color::Cyan),
        Cell::new(state.config.enable_otel),
    ]);
    table.add_row(vec![
        Cell::new("demo.counter_limit").fg(Color::Cyan),
        Cell::new(state.config.demo.counter_limit),
    ]);

    println!("{table}");
    println!();

    Ok(())
}
