use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use stagebench::{BenchConfig, Benchmark, JsonReporter, StdoutReporter};
use tracing::info;

/// Run a staged load benchmark against one or more HTTP(S) targets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the benchmark configuration file
    #[arg(long, default_value = "benchmark/config.toml")]
    config: PathBuf,

    /// Show the execution plan without sending any traffic
    #[arg(long)]
    dry_run: bool,

    /// Emit the plan, stage progress and summary as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the report, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagebench=warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = BenchConfig::load(&args.config)
        .with_context(|| format!("Could not load {}", args.config.display()))?;
    let benchmark = Benchmark::from_config(config, args.dry_run);

    info!(
        "Starting stagebench v{} with {} target(s)",
        env!("CARGO_PKG_VERSION"),
        benchmark.targets.len()
    );
    if args.json {
        benchmark.run(&JsonReporter).await?;
    } else {
        benchmark.run(&StdoutReporter).await?;
    }
    Ok(())
}
