//! Sender orchestrator: emits ICMP/TCP/ARP probes for every target, in the
//! engine's fixed `[TCP, ICMP, ARP]` order, paced in bursts.

use crate::restriction::AliveCapFlag;
use crate::tables::TargetTable;
use alivescan_core::{Error, ProbeAddr, ProbeKind, Result, ScanConfig, TcpProbeFlag};
#[cfg(target_os = "linux")]
use alivescan_net::arp::ArpSocket;
use alivescan_net::icmpv4::Icmpv4EchoRequest;
use alivescan_net::icmpv6::Icmpv6PacketBuilder;
use alivescan_net::interface;
use alivescan_net::packet_builder::{TcpFlags, TcpPacketBuilder, TcpV6PacketBuilder};
use alivescan_net::socket::RawSocket;
use pnet::util::MacAddr;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

/// What the orchestrator emitted this run, used by the lifecycle controller
/// to report how many targets it never got to probe when the alive cap cut
/// iteration short.
pub struct SendReport {
    pub targets_total: usize,
    pub targets_skipped: usize,
}

/// Owns one raw socket per protocol the enabled methods need, plus
/// per-interface ARP sockets opened lazily as targets are routed.
pub struct SenderOrchestrator {
    config: ScanConfig,
    icmp_v4: Option<RawSocket>,
    icmp_v6: Option<RawSocket>,
    tcp_v4: Option<RawSocket>,
    tcp_v6: Option<RawSocket>,
    // Held open for the run but never written to: opening them alongside the
    // TCP sockets reserves the kernel route/bind side-effects the crafted
    // TCP sends rely on.
    _udp_v4: Option<RawSocket>,
    _udp_v6: Option<RawSocket>,
    #[cfg(target_os = "linux")]
    arp_sockets: HashMap<String, ArpSocket>,
    icmp_identifier: u16,
}

impl SenderOrchestrator {
    pub fn open(config: ScanConfig) -> Result<Self> {
        let methods = config.methods;
        let icmp_v4 = methods.icmp.then(|| RawSocket::open(alivescan_core::SocketKind::IcmpV4)).transpose()?;
        let icmp_v6 = methods.icmp.then(|| RawSocket::open(alivescan_core::SocketKind::IcmpV6)).transpose()?;
        let tcp_v4 = methods.tcp.is_some().then(|| RawSocket::open(alivescan_core::SocketKind::TcpV4)).transpose()?;
        let tcp_v6 = methods.tcp.is_some().then(|| RawSocket::open(alivescan_core::SocketKind::TcpV6)).transpose()?;
        let udp_v4 = methods.tcp.is_some().then(|| RawSocket::open(alivescan_core::SocketKind::UdpV4)).transpose()?;
        let udp_v6 = methods.tcp.is_some().then(|| RawSocket::open(alivescan_core::SocketKind::UdpV6)).transpose()?;

        #[cfg(target_os = "linux")]
        let arp_sockets = HashMap::new();

        #[cfg(not(target_os = "linux"))]
        if methods.arp {
            return Err(Error::Socket {
                kind: alivescan_core::SocketKind::ArpV4,
                reason: "ARP probing is only implemented for Linux (AF_PACKET)".to_string(),
            });
        }

        Ok(Self {
            config,
            icmp_v4,
            icmp_v6,
            tcp_v4,
            tcp_v6,
            _udp_v4: udp_v4,
            _udp_v6: udp_v6,
            #[cfg(target_os = "linux")]
            arp_sockets,
            icmp_identifier: std::process::id() as u16,
        })
    }

    #[cfg(target_os = "linux")]
    fn arp_socket_for(&mut self, interface_name: &str) -> Result<&ArpSocket> {
        if !self.arp_sockets.contains_key(interface_name) {
            let socket = ArpSocket::open(interface_name)?;
            self.arp_sockets.insert(interface_name.to_string(), socket);
        }
        Ok(self.arp_sockets.get(interface_name).expect("just inserted"))
    }

    /// Run every enabled probe method (TCP, then ICMP, then ARP) against
    /// every target, pacing in bursts and stopping early once the alive cap
    /// is reached.
    pub fn run<H>(&mut self, targets: &TargetTable<H>, alive_cap: &Arc<AliveCapFlag>) -> SendReport {
        let methods = self.config.methods;
        let mut burst_count: usize = 0;
        let mut probed = std::collections::HashSet::new();

        'methods: for kind in methods.iter_order() {
            let mut stopped_early = false;
            let mut remaining: Vec<(alivescan_core::CanonicalAddr, ProbeAddr)> = Vec::new();
            targets.for_each_target(|addr, probe, _handle| remaining.push((addr.clone(), probe)));

            for (addr, probe) in remaining {
                if alive_cap.is_reached() {
                    stopped_early = true;
                    break;
                }

                probed.insert(addr.clone());
                if let Err(e) = self.send_one(kind, probe) {
                    tracing::warn!(%addr, method = %kind, error = %e, "probe send failed");
                }

                burst_count += 1;
                if burst_count >= self.config.burst_size {
                    burst_count = 0;
                    std::thread::sleep(Duration::from_millis(self.config.burst_pause_ms));
                }
            }

            if stopped_early {
                break 'methods;
            }
        }

        SendReport {
            targets_total: targets.len(),
            targets_skipped: targets.len().saturating_sub(probed.len()),
        }
    }

    fn send_one(&mut self, kind: ProbeKind, dst: ProbeAddr) -> Result<()> {
        match kind {
            ProbeKind::Icmp => self.send_icmp(dst),
            ProbeKind::Tcp => self.send_tcp(dst),
            ProbeKind::Arp => self.send_arp(dst),
        }
    }

    fn send_icmp(&mut self, dst: ProbeAddr) -> Result<()> {
        let packet = Icmpv4EchoRequest::new(self.icmp_identifier, 1, vec![0u8; 56]).build()?;
        match dst {
            ProbeAddr::V4(ip) => {
                let socket = self.icmp_v4.as_ref().ok_or_else(|| Error::Config("ICMPv4 socket not open".into()))?;
                socket.send_to(&packet, IpAddr::V4(ip))?;
            }
            ProbeAddr::V6(ip) => {
                let socket = self.icmp_v6.as_ref().ok_or_else(|| Error::Config("ICMPv6 socket not open".into()))?;
                let src = source_v6_for(ip)?;
                let packet = Icmpv6PacketBuilder::echo_request(self.icmp_identifier, 1, vec![0u8; 56])
                    .build(src, ip)
                    .map_err(|e| Error::Send {
                        dst: ip.to_string(),
                        kind: alivescan_core::SocketKind::IcmpV6,
                        reason: e.to_string(),
                    })?;
                socket.send_to(&packet, IpAddr::V6(ip))?;
            }
        }
        Ok(())
    }

    fn send_tcp(&mut self, dst: ProbeAddr) -> Result<()> {
        let flags = match self.config.methods.tcp {
            Some(TcpProbeFlag::Ack) => TcpFlags::ACK,
            Some(TcpProbeFlag::Syn) => TcpFlags::SYN,
            None => return Ok(()),
        };

        for &port in self.config.tcp_ports.clone().iter() {
            match dst {
                ProbeAddr::V4(ip) => {
                    let src = source_v4_for(ip)?;
                    let packet = TcpPacketBuilder::new()
                        .source_ip(src)
                        .dest_ip(ip)
                        .ttl(64)
                        .source_port(self.config.filter_port)
                        .dest_port(port)
                        .sequence(0)
                        .window(65535)
                        .build(flags)
                        .map_err(|e| Error::Send {
                            dst: ip.to_string(),
                            kind: alivescan_core::SocketKind::TcpV4,
                            reason: e.to_string(),
                        })?;
                    let socket = self.tcp_v4.as_ref().ok_or_else(|| Error::Config("TCPv4 socket not open".into()))?;
                    socket.send_to(&packet, IpAddr::V4(ip))?;
                }
                ProbeAddr::V6(ip) => {
                    let src = source_v6_for(ip)?;
                    let packet = TcpV6PacketBuilder::new()
                        .source_ip(src)
                        .dest_ip(ip)
                        .source_port(self.config.filter_port)
                        .dest_port(port)
                        .sequence(0)
                        .window(65535)
                        .build(flags)
                        .map_err(|e| Error::Send {
                            dst: ip.to_string(),
                            kind: alivescan_core::SocketKind::TcpV6,
                            reason: e.to_string(),
                        })?;
                    let socket = self.tcp_v6.as_ref().ok_or_else(|| Error::Config("TCPv6 socket not open".into()))?;
                    socket.send_to(&packet, IpAddr::V6(ip))?;
                }
            }
        }
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn send_arp(&mut self, dst: ProbeAddr) -> Result<()> {
        match dst {
            ProbeAddr::V4(ip) => {
                let iface = resolve_interface(&self.config, IpAddr::V4(ip))?;
                let sender_mac = interface_mac(&iface)?;
                let sender_ip = iface.first_ipv4().ok_or_else(|| Error::Config("no IPv4 source address for ARP".into()))?;
                let socket = self.arp_socket_for(&iface.name)?;
                socket.send_request(sender_mac, sender_ip, ip)?;
                Ok(())
            }
            ProbeAddr::V6(ip) => {
                let iface = resolve_interface(&self.config, IpAddr::V6(ip))?;
                let src = iface.first_ipv6().ok_or_else(|| Error::Config("no IPv6 source address for ND".into()))?;
                let mac = interface_mac(&iface)?;
                let dst_multicast = solicited_node_multicast(ip);
                let packet = Icmpv6PacketBuilder::neighbor_solicitation(ip, Some(mac.octets()))
                    .build(src, dst_multicast)
                    .map_err(|e| Error::Send {
                        dst: ip.to_string(),
                        kind: alivescan_core::SocketKind::IcmpV6,
                        reason: e.to_string(),
                    })?;
                // ND solicitation shares the ICMPv6 socket since it travels over IPv6, unlike ARP.
                let socket = self.icmp_v6.as_ref().ok_or_else(|| Error::Config("ICMPv6 socket not open for ND".into()))?;
                socket.send_to(&packet, IpAddr::V6(dst_multicast))?;
                Ok(())
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn send_arp(&mut self, _dst: ProbeAddr) -> Result<()> {
        Err(Error::Config("ARP probing is only implemented for Linux".to_string()))
    }
}

/// The solicited-node multicast address for `target`: `ff02::1:ffXX:XXXX`
/// built from the target's low 24 bits, per RFC 4291 §2.7.1.
fn solicited_node_multicast(target: Ipv6Addr) -> Ipv6Addr {
    let octets = target.octets();
    Ipv6Addr::new(
        0xff02,
        0,
        0,
        0,
        0,
        1,
        0xff00 | u16::from(octets[13]),
        u16::from_be_bytes([octets[14], octets[15]]),
    )
}

fn source_v4_for(dst: Ipv4Addr) -> Result<Ipv4Addr> {
    match interface::get_source_ip_for_target(IpAddr::V4(dst))? {
        IpAddr::V4(v4) => Ok(v4),
        IpAddr::V6(_) => Err(Error::Config("expected IPv4 source address".to_string())),
    }
}

fn source_v6_for(dst: Ipv6Addr) -> Result<Ipv6Addr> {
    match interface::get_source_ip_for_target(IpAddr::V6(dst))? {
        IpAddr::V6(v6) => Ok(v6),
        IpAddr::V4(_) => Err(Error::Config("expected IPv6 source address".to_string())),
    }
}

#[cfg(target_os = "linux")]
fn resolve_interface(config: &ScanConfig, dst: IpAddr) -> Result<interface::NetworkInterface> {
    if let Some(name) = &config.interface {
        Ok(interface::find_interface_by_name(name)?)
    } else {
        Ok(interface::find_interface_for_target(dst)?)
    }
}

#[cfg(target_os = "linux")]
fn interface_mac(iface: &interface::NetworkInterface) -> Result<MacAddr> {
    let bytes = iface
        .mac_address
        .as_ref()
        .filter(|m| m.len() == 6)
        .ok_or_else(|| Error::Config(format!("interface {} has no usable MAC address", iface.name)))?;
    Ok(MacAddr::new(bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]))
}
