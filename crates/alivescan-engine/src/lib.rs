//! Alive-detection engine
//!
//! Drives one host-liveness scan end to end: builds the raw sockets and
//! capture handle the enabled detection methods need, runs the sender and
//! sniffer threads, and publishes results to a caller-supplied output queue.
//!
//! # Architecture
//!
//! - [`lifecycle`]: the end-to-end run sequence callers invoke.
//! - [`orchestrator`]: the sender thread, emitting ICMP/TCP/ARP probes.
//! - [`sniffer`]: the capture consumer thread and its lifecycle primitives.
//! - [`restriction`]: max-scan-hosts / max-alive-hosts enforcement.
//! - [`tables`]: the target table and the alive-seen/deferred tracking.
//! - [`queue`]: the downstream output queue interface.
//! - [`management`]: the upstream configuration/target source interface.
//! - [`error`]: engine-specific error type, bridging into [`alivescan_core::Error`].
//!
//! # Example
//!
//! ```no_run
//! use alivescan_engine::{lifecycle, management::ManagementClient, queue::RecordingQueue};
//! use alivescan_core::{MethodSet, ScanConfig};
//! use std::net::IpAddr;
//! use std::sync::Arc;
//!
//! struct FixedClient {
//!     config: ScanConfig,
//!     targets: Vec<(IpAddr, ())>,
//! }
//!
//! impl ManagementClient<()> for FixedClient {
//!     fn config(&self) -> &ScanConfig {
//!         &self.config
//!     }
//!     fn targets(&self) -> Vec<(IpAddr, ())> {
//!         self.targets.clone()
//!     }
//!     fn scan_id(&self) -> &str {
//!         "example"
//!     }
//! }
//!
//! # fn example() -> alivescan_engine::error::EngineResult<()> {
//! let client = FixedClient {
//!     config: ScanConfig {
//!         methods: MethodSet { icmp: true, ..MethodSet::empty() },
//!         ..ScanConfig::default()
//!     },
//!     targets: vec![("192.168.1.1".parse().unwrap(), ())],
//! };
//! let queue = Arc::new(RecordingQueue::new());
//! let summary = lifecycle::run(&client, queue)?;
//! println!("{} alive, {} dead", summary.alive_count, summary.dead_count);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod lifecycle;
pub mod management;
pub mod orchestrator;
pub mod queue;
pub mod restriction;
pub mod sniffer;
pub mod tables;

pub use error::{EngineError, EngineResult};
pub use lifecycle::{run, RunSummary};
pub use management::ManagementClient;
pub use orchestrator::{SendReport, SenderOrchestrator};
pub use queue::{OutputQueue, RecordingQueue};
pub use restriction::{AliveCapFlag, RestrictionController};
pub use sniffer::{SnifferHandle, StartRendezvous, StopFlag};
pub use tables::{AliveTable, TargetTable};
