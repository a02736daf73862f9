//! Raw IP-domain sockets the sender thread uses to emit ICMP and TCP
//! probes. One socket is opened per [`SocketKind`] at startup and kept open
//! for the life of the run; [`super::arp`] sends over a separate
//! link-layer socket since ARP has no IP domain to bind.

use alivescan_core::{Error, SocketKind};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{IpAddr, SocketAddr};

/// A raw socket for one IP-domain protocol. TCP/UDP sockets carry
/// `IP_HDRINCL`/`IPV6_HDRINCL` since the packet builders hand over a
/// complete IP header; ICMP sockets do not, since the kernel fills in the
/// IP header for `SOCK_RAW` + `IPPROTO_ICMP`/`IPPROTO_ICMPV6`.
pub struct RawSocket {
    kind: SocketKind,
    socket: Socket,
}

impl RawSocket {
    pub fn open(kind: SocketKind) -> Result<Self, Error> {
        let (domain, protocol, header_included) = match kind {
            SocketKind::IcmpV4 => (Domain::IPV4, Protocol::ICMPV4, false),
            SocketKind::IcmpV6 => (Domain::IPV6, Protocol::ICMPV6, false),
            SocketKind::TcpV4 => (Domain::IPV4, Protocol::TCP, true),
            SocketKind::TcpV6 => (Domain::IPV6, Protocol::TCP, true),
            SocketKind::UdpV4 => (Domain::IPV4, Protocol::UDP, true),
            SocketKind::UdpV6 => (Domain::IPV6, Protocol::UDP, true),
            SocketKind::ArpV4 | SocketKind::ArpV6 => {
                return Err(Error::Socket {
                    kind,
                    reason: "ARP has no IP-domain raw socket; use arp::ArpSocket".to_string(),
                })
            }
        };

        let socket = Socket::new(domain, Type::RAW, Some(protocol)).map_err(|e| Error::Socket {
            kind,
            reason: e.to_string(),
        })?;

        if header_included {
            set_header_included(&socket, domain).map_err(|e| Error::Socket {
                kind,
                reason: format!("failed to set header-included option: {e}"),
            })?;
        }

        Ok(Self { kind, socket })
    }

    /// Send a fully-built packet to `dst`. For TCP/UDP sockets `packet`
    /// already contains the IP header; for ICMP sockets it is the bare
    /// ICMP message and the kernel supplies the IP header.
    ///
    /// A raw socket's `send_to` can return a short write under load; the
    /// remainder is retried until the whole packet is out or a send fails.
    pub fn send_to(&self, packet: &[u8], dst: IpAddr) -> Result<usize, Error> {
        let addr: SockAddr = SocketAddr::new(dst, 0).into();
        let mut sent = 0;
        while sent < packet.len() {
            let n = self.socket.send_to(&packet[sent..], &addr).map_err(|e| Error::Send {
                dst: dst.to_string(),
                kind: self.kind,
                reason: e.to_string(),
            })?;
            if n == 0 {
                return Err(Error::Send {
                    dst: dst.to_string(),
                    kind: self.kind,
                    reason: "send_to wrote zero bytes".to_string(),
                });
            }
            sent += n;
        }
        Ok(sent)
    }
}

#[cfg(unix)]
fn set_header_included(socket: &Socket, domain: Domain) -> std::io::Result<()> {
    if domain == Domain::IPV6 {
        socket.set_header_included_v6(true)
    } else {
        socket.set_header_included(true)
    }
}
