//! ARP request construction and reply parsing, used as the last-resort
//! liveness probe for targets on the local broadcast domain.

use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::EtherTypes;
use pnet::packet::Packet;
use pnet::util::MacAddr;
use std::net::Ipv4Addr;

use alivescan_core::{Error, SocketKind};

pub type Result<T> = std::result::Result<T, Error>;

/// Builds a "who-has" ARP request for an IPv4 target on the local segment.
#[derive(Debug, Clone)]
pub struct ArpRequest {
    sender_mac: MacAddr,
    sender_ip: Ipv4Addr,
    target_ip: Ipv4Addr,
}

impl ArpRequest {
    pub fn new(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            sender_mac,
            sender_ip,
            target_ip,
        }
    }

    /// Serialize the bare ARP packet (28 bytes, no Ethernet framing).
    pub fn build(self) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; 28];
        let mut packet = MutableArpPacket::new(&mut buffer).ok_or_else(|| Error::Send {
            dst: self.target_ip.to_string(),
            kind: SocketKind::ArpV4,
            reason: "buffer too small for ARP request".to_string(),
        })?;

        packet.set_hardware_type(ArpHardwareTypes::Ethernet);
        packet.set_protocol_type(EtherTypes::Ipv4);
        packet.set_hw_addr_len(6);
        packet.set_proto_addr_len(4);
        packet.set_operation(ArpOperations::Request);
        packet.set_sender_hw_addr(self.sender_mac);
        packet.set_sender_proto_addr(self.sender_ip);
        packet.set_target_hw_addr(MacAddr::zero());
        packet.set_target_proto_addr(self.target_ip);

        Ok(buffer)
    }

    /// The Ethernet destination for the frame carrying this request: the
    /// broadcast address, since the target's MAC is exactly what is unknown.
    pub fn ethernet_destination() -> MacAddr {
        MacAddr::broadcast()
    }
}

/// A parsed ARP reply, with every field the sniffer validates before
/// accepting it as evidence the target is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpReply {
    pub sender_ip: Ipv4Addr,
    pub sender_mac: MacAddr,
}

/// A link-layer socket for broadcasting ARP requests. ARP has no IP domain
/// to bind a `socket2::Socket` to, so this goes straight to `AF_PACKET`.
#[cfg(target_os = "linux")]
pub struct ArpSocket {
    fd: std::os::fd::OwnedFd,
    if_index: i32,
}

#[cfg(target_os = "linux")]
impl ArpSocket {
    pub fn open(interface_name: &str) -> Result<Self> {
        use std::ffi::CString;
        use std::os::fd::{FromRawFd, OwnedFd};

        let fd = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, (libc::ETH_P_ARP as u16).to_be() as i32) };
        if fd < 0 {
            return Err(Error::Socket {
                kind: SocketKind::ArpV4,
                reason: std::io::Error::last_os_error().to_string(),
            });
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        let name = CString::new(interface_name).map_err(|e| Error::Socket {
            kind: SocketKind::ArpV4,
            reason: e.to_string(),
        })?;
        let if_index = unsafe { libc::if_nametoindex(name.as_ptr()) } as i32;
        if if_index == 0 {
            return Err(Error::Socket {
                kind: SocketKind::ArpV4,
                reason: format!("unknown interface {interface_name}"),
            });
        }

        Ok(Self { fd, if_index })
    }

    /// Send an Ethernet-framed ARP request, broadcasting to `ff:ff:ff:ff:ff:ff`.
    pub fn send_request(&self, sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Result<()> {
        use std::os::fd::AsRawFd;

        let arp_payload = ArpRequest::new(sender_mac, sender_ip, target_ip).build()?;

        let mut sockaddr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        sockaddr.sll_family = libc::AF_PACKET as u16;
        sockaddr.sll_protocol = (libc::ETH_P_ARP as u16).to_be();
        sockaddr.sll_ifindex = self.if_index;
        sockaddr.sll_halen = 6;
        sockaddr.sll_addr[..6].copy_from_slice(&ArpRequest::ethernet_destination().octets());

        let ret = unsafe {
            libc::sendto(
                self.fd.as_raw_fd(),
                arp_payload.as_ptr() as *const libc::c_void,
                arp_payload.len(),
                0,
                &sockaddr as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };

        if ret < 0 {
            return Err(Error::Send {
                dst: target_ip.to_string(),
                kind: SocketKind::ArpV4,
                reason: std::io::Error::last_os_error().to_string(),
            });
        }

        Ok(())
    }
}

/// Parses and validates an ARP reply. Rejects anything that is not a
/// well-formed Ethernet/IPv4 "is-at" reply, which is the only ARP shape the
/// sniffer accepts as liveness evidence.
pub fn parse_reply(packet: &[u8]) -> Option<ArpReply> {
    let arp = ArpPacket::new(packet)?;

    if arp.get_hardware_type() != ArpHardwareTypes::Ethernet
        || arp.get_protocol_type() != EtherTypes::Ipv4
        || arp.get_hw_addr_len() != 6
        || arp.get_proto_addr_len() != 4
        || arp.get_operation() != ArpOperations::Reply
    {
        return None;
    }

    Some(ArpReply {
        sender_ip: arp.get_sender_proto_addr(),
        sender_mac: arp.get_sender_hw_addr(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_parse_reply_shape() {
        let mac = MacAddr::new(0, 1, 2, 3, 4, 5);
        let packet = ArpRequest::new(mac, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
            .build()
            .unwrap();
        let arp = ArpPacket::new(&packet).unwrap();
        assert_eq!(arp.get_operation(), ArpOperations::Request);
        assert_eq!(arp.get_sender_proto_addr(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(arp.get_target_proto_addr(), Ipv4Addr::new(10, 0, 0, 2));
    }

    #[test]
    fn parse_reply_accepts_well_formed_ethernet_ipv4_reply() {
        let mut buffer = vec![0u8; 28];
        let mut packet = MutableArpPacket::new(&mut buffer).unwrap();
        packet.set_hardware_type(ArpHardwareTypes::Ethernet);
        packet.set_protocol_type(EtherTypes::Ipv4);
        packet.set_hw_addr_len(6);
        packet.set_proto_addr_len(4);
        packet.set_operation(ArpOperations::Reply);
        packet.set_sender_hw_addr(MacAddr::new(0xAA, 0xBB, 0xCC, 0, 0, 1));
        packet.set_sender_proto_addr(Ipv4Addr::new(192, 168, 1, 1));
        packet.set_target_hw_addr(MacAddr::new(0, 1, 2, 3, 4, 5));
        packet.set_target_proto_addr(Ipv4Addr::new(192, 168, 1, 2));
        drop(packet);

        let reply = parse_reply(&buffer).unwrap();
        assert_eq!(reply.sender_ip, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(reply.sender_mac, MacAddr::new(0xAA, 0xBB, 0xCC, 0, 0, 1));
    }

    #[test]
    fn parse_reply_rejects_request_operation() {
        let mac = MacAddr::new(0, 1, 2, 3, 4, 5);
        let packet = ArpRequest::new(mac, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
            .build()
            .unwrap();
        assert!(parse_reply(&packet).is_none());
    }

    #[test]
    fn parse_reply_rejects_truncated_packet() {
        assert!(parse_reply(&[0u8; 4]).is_none());
    }
}
