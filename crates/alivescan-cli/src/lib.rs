//! alivescan CLI library
//!
//! Provides the command-line components for the alivescan host-liveness
//! engine: argument parsing, target-spec expansion, the stdout-backed
//! output queue, and the summary report.

pub mod args;
pub mod banner;
pub mod client;
pub mod error;
pub mod queue;
pub mod report;
pub mod targets;

pub use args::Args;
pub use banner::Banner;
pub use client::CliClient;
pub use error::{exit_codes, CliError};
pub use queue::StdoutQueue;
pub use report::SummaryReport;
