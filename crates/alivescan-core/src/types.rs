//! Shared value types for the alive-detection engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Canonical textual key for an address: dotted-quad for IPv4, lowercase
/// colon-hex for IPv6, with IPv4-mapped IPv6 addresses (`::ffff:0:0/96`)
/// collapsed to their IPv4 form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalAddr(String);

impl CanonicalAddr {
    /// Build the canonical key for an address, collapsing IPv4-mapped IPv6.
    pub fn new(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self(v4.to_string()),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Self(v4.to_string()),
                None => Self(v6.to_string()),
            },
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the underlying address is IPv4 or an IPv4-mapped IPv6 address.
    pub fn is_v4_form(&self) -> bool {
        self.0.parse::<Ipv4Addr>().is_ok()
    }
}

impl fmt::Display for CanonicalAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Ipv4Addr> for CanonicalAddr {
    fn from(v4: Ipv4Addr) -> Self {
        CanonicalAddr(v4.to_string())
    }
}

impl From<Ipv6Addr> for CanonicalAddr {
    fn from(v6: Ipv6Addr) -> Self {
        CanonicalAddr::new(IpAddr::V6(v6))
    }
}

/// Either form of a destination address, resolved once at target-insertion
/// time so probe builders never have to re-derive the mapped/unmapped split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAddr {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl ProbeAddr {
    pub fn from_ip(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => ProbeAddr::V4(v4),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => ProbeAddr::V4(v4),
                None => ProbeAddr::V6(v6),
            },
        }
    }

    pub fn canonical(&self) -> CanonicalAddr {
        match self {
            ProbeAddr::V4(v4) => CanonicalAddr::from(*v4),
            ProbeAddr::V6(v6) => CanonicalAddr::from(*v6),
        }
    }

    pub fn is_v4(&self) -> bool {
        matches!(self, ProbeAddr::V4(_))
    }
}

/// Which TCP control flag the TCP probe sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TcpProbeFlag {
    /// Service-style probe; a bare RST in reply still proves liveness.
    Ack,
    /// Connect-style probe.
    Syn,
}

/// The detection methods enabled for a run. `tcp` selects ACK vs. SYN framing
/// for the single TCP prober; the two are not independently toggleable since
/// exactly one flag is ever placed on the wire per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSet {
    #[serde(default)]
    pub icmp: bool,
    #[serde(default)]
    pub tcp: Option<TcpProbeFlag>,
    #[serde(default)]
    pub arp: bool,
    #[serde(default)]
    pub consider_alive: bool,
}

impl MethodSet {
    pub const fn empty() -> Self {
        Self {
            icmp: false,
            tcp: None,
            arp: false,
            consider_alive: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.icmp && self.tcp.is_none() && !self.arp && !self.consider_alive
    }

    /// The engine's canonical probe iteration order: TCP, then ICMP, then ARP.
    pub fn iter_order(&self) -> impl Iterator<Item = ProbeKind> + '_ {
        [
            self.tcp.map(|_| ProbeKind::Tcp),
            self.icmp.then_some(ProbeKind::Icmp),
            self.arp.then_some(ProbeKind::Arp),
        ]
        .into_iter()
        .flatten()
    }
}

/// One entry of the fixed `[TCP, ICMP, ARP]` iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Tcp,
    Icmp,
    Arp,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeKind::Tcp => "TCP",
            ProbeKind::Icmp => "ICMP",
            ProbeKind::Arp => "ARP",
        };
        f.write_str(s)
    }
}

/// Identifies one of the eight raw-socket kinds the socket layer can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    IcmpV4,
    IcmpV6,
    TcpV4,
    TcpV6,
    UdpV4,
    UdpV6,
    ArpV4,
    ArpV6,
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SocketKind::IcmpV4 => "icmpv4",
            SocketKind::IcmpV6 => "icmpv6",
            SocketKind::TcpV4 => "tcpv4",
            SocketKind::TcpV6 => "tcpv6",
            SocketKind::UdpV4 => "udpv4",
            SocketKind::UdpV6 => "udpv6",
            SocketKind::ArpV4 => "arpv4",
            SocketKind::ArpV6 => "arpv6",
        };
        f.write_str(s)
    }
}

/// The socket kinds a given method set requires the raw socket layer to open.
pub fn required_sockets(methods: &MethodSet) -> Vec<SocketKind> {
    let mut kinds = Vec::new();
    if methods.icmp {
        kinds.push(SocketKind::IcmpV4);
        kinds.push(SocketKind::IcmpV6);
    }
    if methods.tcp.is_some() {
        kinds.push(SocketKind::TcpV4);
        kinds.push(SocketKind::TcpV6);
        kinds.push(SocketKind::UdpV4);
        kinds.push(SocketKind::UdpV6);
    }
    if methods.arp {
        kinds.push(SocketKind::ArpV4);
        kinds.push(SocketKind::ArpV6);
    }
    kinds
}
