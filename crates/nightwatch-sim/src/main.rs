//! # Nightwatch
//!
//! Runs a guard scenario headless and prints the signal trace.
//!
//! Usage: `nightwatch [scenario.toml] [--json]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nightwatch_sim::{Scenario, ScenarioRunner};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Scenario used when no path is given.
const DEFAULT_SCENARIO: &str = "demos/patrol.toml";

/// Nightwatch scenario runner
#[derive(Parser, Debug)]
#[command(name = "nightwatch")]
#[command(about = "Run a guard scenario headless and print the signal trace")]
struct Args {
    /// Scenario file to run
    #[arg(default_value = DEFAULT_SCENARIO)]
    scenario: PathBuf,

    /// Print the trace as JSON lines
    #[arg(long)]
    json: bool,
}

/// Main entry point.
fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("nightwatch=info".parse()?))
        .init();

    info!("Nightwatch starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;
    let report = ScenarioRunner::new(scenario)?.run();

    if args.json {
        println!("{}", report.to_json_lines()?);
    } else {
        for entry in &report.trace {
            println!(
                "{:>7.2}s  {:<16} {:?}",
                entry.time,
                entry.state.display_name(),
                entry.signal
            );
        }
    }

    info!(
        "Done: {} steps, {} transitions, {:.1}s alerted, final state {}",
        report.steps,
        report.state_changes().len(),
        report.alerted_time,
        report.final_state
    );
    Ok(())
}
