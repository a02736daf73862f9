//! Core types, error handling, and configuration for the alivescan
//! host-liveness engine.
//!
//! # Examples
//!
//! ```
//! use alivescan_core::{MethodSet, ScanConfig};
//!
//! let mut config = ScanConfig {
//!     methods: MethodSet { icmp: true, ..MethodSet::empty() },
//!     ..ScanConfig::default()
//! };
//! config.max_scan_hosts = 5;
//! let config = config.validate().unwrap();
//! assert_eq!(config.tcp_ports.len(), 5);
//! ```

pub mod config;
pub mod error;
pub mod types;

pub use config::{ScanConfig, DEFAULT_FILTER_PORT, DEFAULT_TCP_PORTS};
pub use error::{Error, Result};
pub use types::{
    required_sockets, CanonicalAddr, MethodSet, ProbeAddr, ProbeKind, SocketKind, TcpProbeFlag,
};
