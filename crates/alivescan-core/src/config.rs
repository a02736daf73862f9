//! Resolved scan configuration for the alive-detection engine.

use crate::error::{Error, Result};
use crate::types::MethodSet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

/// The fixed TCP ports probed by default, matching the historical defaults
/// of the source this engine's TCP probing is modeled on.
pub const DEFAULT_TCP_PORTS: [u16; 5] = [80, 137, 587, 3128, 8081];

/// Fixed local TCP source port the prober binds to, so replies can be
/// recognized by the capture filter without per-probe state.
pub const DEFAULT_FILTER_PORT: u16 = 34952;

/// Fully resolved configuration handed to the lifecycle controller. Produced
/// by layering defaults, an optional TOML file, and CLI overrides (the CLI
/// crate owns that layering; this type only validates the final result).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Detection methods to run, in the engine's fixed iteration order.
    pub methods: MethodSet,

    /// Preferred egress address. When absent, resolved per-target by route
    /// lookup.
    #[serde(default)]
    pub source_address: Option<IpAddr>,

    /// Name of the interface to bind sockets and the capture handle to. When
    /// absent, the capture handle listens on "any" and per-target route
    /// lookup picks the egress interface for sends.
    #[serde(default)]
    pub interface: Option<String>,

    /// Ordered TCP destination ports probed per target.
    #[serde(default = "default_tcp_ports")]
    pub tcp_ports: Vec<u16>,

    /// Fixed TCP source port used by the prober and the capture filter.
    #[serde(default = "default_filter_port")]
    pub filter_port: u16,

    /// Number of probes sent by a single sender before pausing.
    #[serde(default = "default_burst_size")]
    pub burst_size: usize,

    /// Pause after every `burst_size` probes, in milliseconds.
    #[serde(default = "default_burst_pause_ms")]
    pub burst_pause_ms: u64,

    /// Time to keep capturing after the last probe is emitted, in
    /// milliseconds.
    #[serde(default = "default_reply_drain_ms")]
    pub reply_drain_ms: u64,

    /// Cap on hosts forwarded downstream.
    #[serde(default = "default_max_hosts")]
    pub max_scan_hosts: usize,

    /// Cap on probing activity; normalized to be at least `max_scan_hosts`.
    #[serde(default = "default_max_hosts")]
    pub max_alive_hosts: usize,
}

fn default_tcp_ports() -> Vec<u16> {
    DEFAULT_TCP_PORTS.to_vec()
}

fn default_filter_port() -> u16 {
    DEFAULT_FILTER_PORT
}

fn default_burst_size() -> usize {
    100
}

fn default_burst_pause_ms() -> u64 {
    10
}

fn default_reply_drain_ms() -> u64 {
    3_000
}

fn default_max_hosts() -> usize {
    usize::MAX
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            methods: MethodSet::empty(),
            source_address: None,
            interface: None,
            tcp_ports: default_tcp_ports(),
            filter_port: default_filter_port(),
            burst_size: default_burst_size(),
            burst_pause_ms: default_burst_pause_ms(),
            reply_drain_ms: default_reply_drain_ms(),
            max_scan_hosts: default_max_hosts(),
            max_alive_hosts: default_max_hosts(),
        }
    }
}

impl ScanConfig {
    /// Load a configuration layer from a TOML file. Any field absent from
    /// the file falls back to [`ScanConfig::default`].
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {path:?}: {e}")))?;
        Self::load_from_str(&contents)
    }

    /// Load a configuration layer from a TOML string.
    pub fn load_from_str(contents: &str) -> Result<Self> {
        let config: ScanConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Validate and normalize the configuration.
    ///
    /// Normalization is the cap invariant from the source this engine is
    /// modeled on: `max_alive_hosts` can never be tighter than
    /// `max_scan_hosts`, since the alive-stop cap would otherwise halt
    /// probing before every permitted host could be published.
    pub fn validate(mut self) -> Result<Self> {
        if self.methods.is_empty() {
            return Err(Error::Config(
                "no detection method selected (need at least one of icmp/tcp/arp/consider_alive)"
                    .to_string(),
            ));
        }

        if self.tcp_ports.iter().any(|&p| p == 0) {
            tracing::warn!(
                "supplied tcp_ports contains port 0; falling back to the default port list"
            );
            self.tcp_ports = default_tcp_ports();
        }

        if self.tcp_ports.is_empty() {
            self.tcp_ports = default_tcp_ports();
        }

        if self.max_alive_hosts < self.max_scan_hosts {
            self.max_alive_hosts = self.max_scan_hosts;
        }

        Ok(self)
    }
}
