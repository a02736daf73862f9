//! CLI argument parsing.

use alivescan_core::{MethodSet, ScanConfig, TcpProbeFlag};
use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// alivescan - host-liveness detection engine
///
/// Probes a set of targets with ICMP, TCP, and ARP/ND and reports which are
/// reachable, gating them for a downstream vulnerability scan.
#[derive(Parser, Debug)]
#[command(
    name = "alivescan",
    version,
    about = "Host-liveness detection engine",
    author = "alivescan contributors"
)]
pub struct Args {
    /// Target specification (IP, CIDR, or hostname), one or more.
    #[arg(value_name = "TARGET", required = true, help_heading = "TARGET SPECIFICATION")]
    pub targets: Vec<String>,

    /// Send ICMP echo/neighbor-solicitation probes.
    #[arg(long, help_heading = "DETECTION METHODS")]
    pub icmp: bool,

    /// Send TCP probes using the given flag.
    #[arg(long, value_enum, value_name = "FLAG", help_heading = "DETECTION METHODS")]
    pub tcp: Option<TcpFlagArg>,

    /// Send ARP requests (IPv4 LAN targets) / neighbor solicitations (IPv6).
    #[arg(long, help_heading = "DETECTION METHODS")]
    pub arp: bool,

    /// Skip probing entirely; every target is reported alive.
    #[arg(long = "consider-alive", help_heading = "DETECTION METHODS")]
    pub consider_alive: bool,

    /// TCP destination ports to probe, comma-separated.
    #[arg(long, value_name = "PORTS", value_delimiter = ',', help_heading = "PROBE TUNING")]
    pub tcp_ports: Option<Vec<u16>>,

    /// Fixed TCP source port used by the prober and the capture filter.
    #[arg(long, value_name = "PORT", help_heading = "PROBE TUNING")]
    pub filter_port: Option<u16>,

    /// Egress interface name. Defaults to per-target route lookup.
    #[arg(short = 'i', long, value_name = "NAME", help_heading = "PROBE TUNING")]
    pub interface: Option<String>,

    /// Preferred source address for crafted packets.
    #[arg(long, value_name = "ADDR", help_heading = "PROBE TUNING")]
    pub source_address: Option<IpAddr>,

    /// Probes sent before the sender pauses.
    #[arg(long, value_name = "N", help_heading = "PROBE TUNING")]
    pub burst_size: Option<usize>,

    /// Pause after every burst, in milliseconds.
    #[arg(long, value_name = "MS", help_heading = "PROBE TUNING")]
    pub burst_pause_ms: Option<u64>,

    /// Time to keep capturing after the last probe is sent, in milliseconds.
    #[arg(long, value_name = "MS", help_heading = "PROBE TUNING")]
    pub reply_drain_ms: Option<u64>,

    /// Stop scanning once this many hosts have been accounted for.
    #[arg(long, value_name = "N", help_heading = "CAPS")]
    pub max_scan_hosts: Option<usize>,

    /// Stop publishing once this many alive hosts have been reported.
    #[arg(long, value_name = "N", help_heading = "CAPS")]
    pub max_alive_hosts: Option<usize>,

    /// Load a TOML configuration file; CLI flags override its values.
    #[arg(short = 'c', long, value_name = "PATH", help_heading = "CONFIGURATION")]
    pub config: Option<PathBuf>,

    /// Record results in memory and print them instead of publishing to
    /// stdout incrementally. Useful for scripted dry runs.
    #[arg(long, help_heading = "OUTPUT")]
    pub record: bool,

    /// Increase log verbosity (-v debug, -vv trace). Overrides RUST_LOG.
    #[arg(short = 'v', long, action = clap::ArgAction::Count, help_heading = "OUTPUT")]
    pub verbose: u8,

    /// Suppress the startup banner and summary, leaving only the published
    /// alive-host stream.
    #[arg(short = 'q', long, help_heading = "OUTPUT")]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpFlagArg {
    Ack,
    Syn,
}

impl From<TcpFlagArg> for TcpProbeFlag {
    fn from(flag: TcpFlagArg) -> Self {
        match flag {
            TcpFlagArg::Ack => TcpProbeFlag::Ack,
            TcpFlagArg::Syn => TcpProbeFlag::Syn,
        }
    }
}

impl Args {
    /// Layer this invocation's flags onto a base configuration (the default,
    /// or one loaded from `--config`). Only flags the user actually passed
    /// override the base; everything else keeps the base's value.
    pub fn apply_overrides(&self, mut config: ScanConfig) -> ScanConfig {
        if self.icmp || self.tcp.is_some() || self.arp || self.consider_alive {
            config.methods = MethodSet {
                icmp: self.icmp || config.methods.icmp,
                tcp: self.tcp.map(Into::into).or(config.methods.tcp),
                arp: self.arp || config.methods.arp,
                consider_alive: self.consider_alive || config.methods.consider_alive,
            };
        }

        if let Some(ports) = &self.tcp_ports {
            config.tcp_ports = ports.clone();
        }
        if let Some(port) = self.filter_port {
            config.filter_port = port;
        }
        if self.interface.is_some() {
            config.interface = self.interface.clone();
        }
        if self.source_address.is_some() {
            config.source_address = self.source_address;
        }
        if let Some(n) = self.burst_size {
            config.burst_size = n;
        }
        if let Some(ms) = self.burst_pause_ms {
            config.burst_pause_ms = ms;
        }
        if let Some(ms) = self.reply_drain_ms {
            config.reply_drain_ms = ms;
        }
        if let Some(n) = self.max_scan_hosts {
            config.max_scan_hosts = n;
        }
        if let Some(n) = self.max_alive_hosts {
            config.max_alive_hosts = n;
        }

        config
    }

    /// The `tracing` level implied by `-v`/`-vv`, or `None` to defer to
    /// `RUST_LOG`.
    pub fn verbosity_override(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::parse_from(argv)
    }

    #[test]
    fn overrides_only_apply_when_flags_are_present() {
        let args = parse(&["alivescan", "10.0.0.1", "--icmp"]);
        let config = args.apply_overrides(ScanConfig::default());
        assert!(config.methods.icmp);
        assert_eq!(config.tcp_ports, ScanConfig::default().tcp_ports);
    }

    #[test]
    fn tcp_ports_flag_replaces_the_default_list() {
        let args = parse(&["alivescan", "10.0.0.1", "--tcp", "syn", "--tcp-ports", "22,443"]);
        let config = args.apply_overrides(ScanConfig::default());
        assert_eq!(config.methods.tcp, Some(TcpProbeFlag::Syn));
        assert_eq!(config.tcp_ports, vec![22, 443]);
    }

    #[test]
    fn verbosity_tracks_repeat_count() {
        assert_eq!(parse(&["alivescan", "10.0.0.1"]).verbosity_override(), None);
        assert_eq!(parse(&["alivescan", "10.0.0.1", "-v"]).verbosity_override(), Some("debug"));
        assert_eq!(parse(&["alivescan", "10.0.0.1", "-vv"]).verbosity_override(), Some("trace"));
    }
}
