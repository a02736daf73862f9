//! alivescan CLI
//!
//! Command-line front end for the alivescan host-liveness engine.

mod args;
mod banner;
mod client;
mod error;
mod queue;
mod report;
mod targets;

use alivescan_core::ScanConfig;
use alivescan_engine::lifecycle;
use anyhow::Result;
use args::Args;
use banner::Banner;
use clap::Parser;
use client::CliClient;
use colored::Colorize;
use error::CliError;
use queue::StdoutQueue;
use report::SummaryReport;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    init_logging(&args);

    if !args.quiet {
        Banner::default().print();
    }

    match run(&args) {
        Ok(_summary) => {
            std::process::exit(error::exit_codes::SUCCESS);
        }
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            let code = e
                .downcast_ref::<CliError>()
                .map(CliError::exit_code)
                .unwrap_or(error::exit_codes::SCAN_FAILED);
            std::process::exit(code);
        }
    }
}

fn init_logging(args: &Args) {
    let filter = match args.verbosity_override() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: &Args) -> Result<alivescan_engine::RunSummary> {
    let base_config = match &args.config {
        Some(path) => {
            ScanConfig::load_from_file(path).map_err(|e| CliError::Config(e.to_string()))?
        }
        None => match default_config_path() {
            Some(path) if path.exists() => {
                ScanConfig::load_from_file(&path).map_err(|e| CliError::Config(e.to_string()))?
            }
            _ => ScanConfig::default(),
        },
    };
    let config = args.apply_overrides(base_config);

    let addrs = targets::expand_all(&args.targets).map_err(|e| CliError::InvalidTarget {
        spec: args.targets.join(","),
        reason: e.to_string(),
    })?;
    if addrs.is_empty() {
        return Err(CliError::NoTargets.into());
    }

    let scan_id = uuid::Uuid::new_v4().to_string();
    let client = CliClient::new(config, addrs, scan_id);

    let queue: Arc<dyn alivescan_engine::OutputQueue> = if args.record {
        Arc::new(alivescan_engine::RecordingQueue::new())
    } else {
        Arc::new(StdoutQueue::new())
    };

    let started_at = chrono::Utc::now();
    let start = std::time::Instant::now();
    let summary = lifecycle::run(&client, queue.clone()).map_err(CliError::from)?;
    let elapsed = start.elapsed();

    if !args.quiet {
        SummaryReport::new(&summary, started_at, elapsed).print();
    }

    Ok(summary)
}

/// `$XDG_CONFIG_HOME/alivescan/config.toml` (or the platform equivalent),
/// used when `--config` is not given. Absence is not an error; callers fall
/// back to [`ScanConfig::default`].
fn default_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("alivescan").join("config.toml"))
}
