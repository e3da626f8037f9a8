//! Quality Control (wkmp-qc) - Replay entry point
//!
//! Replays a recorded submission session through the quality-control
//! engine and prints the resulting summary, progress snapshot, analytics
//! and time insights as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wkmp_qc::script::ReplayScript;
use wkmp_qc::QcConfig;

/// Command-line arguments for wkmp-qc
#[derive(Parser, Debug)]
#[command(name = "wkmp-qc")]
#[command(about = "Replay a metadata submission session through WKMP quality control")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "WKMP_QC_CONFIG")]
    config: Option<PathBuf>,

    /// Replay script (JSON)
    script: PathBuf,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wkmp_qc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = QcConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let script = ReplayScript::load(&args.script)
        .with_context(|| format!("Failed to load replay script {}", args.script.display()))?;
    info!(
        "Replaying {} steps from {}",
        script.steps.len(),
        args.script.display()
    );

    let report = script.run(config).context("Replay failed")?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("Failed to serialize report")?;
    println!("{}", output);

    Ok(())
}
