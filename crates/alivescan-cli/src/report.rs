//! Human-readable run summary, printed after the scan finishes.

use alivescan_engine::RunSummary;
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::time::Duration;

pub struct SummaryReport<'a> {
    summary: &'a RunSummary,
    started_at: DateTime<Utc>,
    elapsed: Duration,
}

impl<'a> SummaryReport<'a> {
    pub fn new(summary: &'a RunSummary, started_at: DateTime<Utc>, elapsed: Duration) -> Self {
        Self {
            summary,
            started_at,
            elapsed,
        }
    }

    pub fn print(&self) {
        println!("{}", "=== alivescan summary ===".bright_white().bold());
        println!(
            "Started: {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("Elapsed: {:.2}s", self.elapsed.as_secs_f64());
        println!(
            "Targets: {}  Alive: {}  Dead: {}  Skipped: {}",
            self.summary.targets_total.to_string().cyan(),
            self.summary.alive_count.to_string().green().bold(),
            self.summary.dead_count.to_string().red(),
            self.summary.targets_skipped.to_string().yellow(),
        );

        if self.summary.scan_cap_reached {
            println!("{}", "max_scan_hosts reached".yellow());
        }
        if self.summary.alive_cap_reached {
            println!("{}", "max_alive_hosts reached".yellow());
        }
    }
}
