//! Raw TCP packet construction (IPv4 and IPv6) for the TCP liveness prober.
//!
//! The prober always emits a single TCP segment with no payload and no
//! options; no Ethernet framing is built here since the raw socket layer
//! hands IP packets straight to the kernel.

use pnet::packet::{
    ip::IpNextHeaderProtocols,
    ipv4::{checksum as ipv4_checksum, MutableIpv4Packet},
    ipv6::MutableIpv6Packet,
    tcp::{ipv4_checksum as tcp_ipv4_checksum, ipv6_checksum as tcp_ipv6_checksum, MutableTcpPacket},
};
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

/// Errors that can occur during packet construction.
#[derive(Debug, Error)]
pub enum PacketBuilderError {
    #[error("Buffer too small for packet: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl From<PacketBuilderError> for alivescan_core::Error {
    fn from(err: PacketBuilderError) -> Self {
        alivescan_core::Error::Send {
            dst: "unknown".to_string(),
            kind: alivescan_core::SocketKind::TcpV4,
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PacketBuilderError>;

/// TCP control flags as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpFlags(pub u8);

impl TcpFlags {
    pub const SYN: TcpFlags = TcpFlags(0b0000_0010);
    pub const RST: TcpFlags = TcpFlags(0b0000_0100);
    pub const ACK: TcpFlags = TcpFlags(0b0001_0000);

    pub const fn empty() -> Self {
        TcpFlags(0)
    }

    pub fn combine(&self, other: TcpFlags) -> Self {
        TcpFlags(self.0 | other.0)
    }

    pub fn has(&self, flag: TcpFlags) -> bool {
        (self.0 & flag.0) != 0
    }
}

/// Builder for a bare IPv4 TCP segment (no Ethernet framing).
#[derive(Debug, Clone)]
pub struct TcpPacketBuilder {
    src_ip: Option<Ipv4Addr>,
    dst_ip: Option<Ipv4Addr>,
    ttl: u8,
    ip_id: u16,
    src_port: Option<u16>,
    dst_port: Option<u16>,
    seq: u32,
    window: u16,
}

impl Default for TcpPacketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpPacketBuilder {
    pub fn new() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Self {
            src_ip: None,
            dst_ip: None,
            ttl: 64,
            ip_id: rng.gen(),
            src_port: None,
            dst_port: None,
            seq: rng.gen(),
            window: 65535,
        }
    }

    pub fn source_ip(mut self, ip: Ipv4Addr) -> Self {
        self.src_ip = Some(ip);
        self
    }

    pub fn dest_ip(mut self, ip: Ipv4Addr) -> Self {
        self.dst_ip = Some(ip);
        self
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    /// The prober's source port is always the engine's fixed filter port, so
    /// the capture BPF filter can match replies without per-probe state.
    pub fn source_port(mut self, port: u16) -> Self {
        self.src_port = Some(port);
        self
    }

    pub fn dest_port(mut self, port: u16) -> Self {
        self.dst_port = Some(port);
        self
    }

    pub fn sequence(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    pub fn window(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    /// Build the IPv4 header plus TCP header with the given flags and no
    /// payload.
    pub fn build(self, flags: TcpFlags) -> Result<Vec<u8>> {
        let src_ip = self
            .src_ip
            .ok_or_else(|| PacketBuilderError::MissingField("source_ip".to_string()))?;
        let dst_ip = self
            .dst_ip
            .ok_or_else(|| PacketBuilderError::MissingField("dest_ip".to_string()))?;
        let src_port = self
            .src_port
            .ok_or_else(|| PacketBuilderError::MissingField("source_port".to_string()))?;
        let dst_port = self
            .dst_port
            .ok_or_else(|| PacketBuilderError::MissingField("dest_port".to_string()))?;

        let tcp_size = 20;
        let ip_total = 20 + tcp_size;
        let mut buffer = vec![0u8; ip_total];

        {
            let mut ip_packet = MutableIpv4Packet::new(&mut buffer[..20]).ok_or(
                PacketBuilderError::BufferTooSmall {
                    needed: 20,
                    available: buffer.len(),
                },
            )?;
            ip_packet.set_version(4);
            ip_packet.set_header_length(5);
            ip_packet.set_total_length(ip_total as u16);
            ip_packet.set_identification(self.ip_id);
            ip_packet.set_flags(2);
            ip_packet.set_ttl(self.ttl);
            ip_packet.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
            ip_packet.set_source(src_ip);
            ip_packet.set_destination(dst_ip);
            let checksum = ipv4_checksum(&ip_packet.to_immutable());
            ip_packet.set_checksum(checksum);
        }

        {
            let mut tcp_packet = MutableTcpPacket::new(&mut buffer[20..]).ok_or(
                PacketBuilderError::BufferTooSmall {
                    needed: tcp_size,
                    available: buffer.len() - 20,
                },
            )?;
            tcp_packet.set_source(src_port);
            tcp_packet.set_destination(dst_port);
            tcp_packet.set_sequence(self.seq);
            tcp_packet.set_acknowledgement(0);
            tcp_packet.set_data_offset(5);
            tcp_packet.set_flags(flags.0);
            tcp_packet.set_window(self.window);
            let checksum = tcp_ipv4_checksum(&tcp_packet.to_immutable(), &src_ip, &dst_ip);
            tcp_packet.set_checksum(checksum);
        }

        Ok(buffer)
    }
}

/// Builder for a bare IPv6 TCP segment (no extension headers, no Ethernet
/// framing).
#[derive(Debug, Clone)]
pub struct TcpV6PacketBuilder {
    src_ip: Option<Ipv6Addr>,
    dst_ip: Option<Ipv6Addr>,
    hop_limit: u8,
    src_port: Option<u16>,
    dst_port: Option<u16>,
    seq: u32,
    window: u16,
}

impl Default for TcpV6PacketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpV6PacketBuilder {
    pub fn new() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Self {
            src_ip: None,
            dst_ip: None,
            hop_limit: 64,
            src_port: None,
            dst_port: None,
            seq: rng.gen(),
            window: 65535,
        }
    }

    pub fn source_ip(mut self, ip: Ipv6Addr) -> Self {
        self.src_ip = Some(ip);
        self
    }

    pub fn dest_ip(mut self, ip: Ipv6Addr) -> Self {
        self.dst_ip = Some(ip);
        self
    }

    pub fn source_port(mut self, port: u16) -> Self {
        self.src_port = Some(port);
        self
    }

    pub fn dest_port(mut self, port: u16) -> Self {
        self.dst_port = Some(port);
        self
    }

    pub fn sequence(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    pub fn window(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    pub fn build(self, flags: TcpFlags) -> Result<Vec<u8>> {
        let src_ip = self
            .src_ip
            .ok_or_else(|| PacketBuilderError::MissingField("source_ip".to_string()))?;
        let dst_ip = self
            .dst_ip
            .ok_or_else(|| PacketBuilderError::MissingField("dest_ip".to_string()))?;
        let src_port = self
            .src_port
            .ok_or_else(|| PacketBuilderError::MissingField("source_port".to_string()))?;
        let dst_port = self
            .dst_port
            .ok_or_else(|| PacketBuilderError::MissingField("dest_port".to_string()))?;

        let tcp_size = 20;
        let total = 40 + tcp_size;
        let mut buffer = vec![0u8; total];

        {
            let mut ip_packet = MutableIpv6Packet::new(&mut buffer[..40]).ok_or(
                PacketBuilderError::BufferTooSmall {
                    needed: 40,
                    available: buffer.len(),
                },
            )?;
            ip_packet.set_version(6);
            ip_packet.set_payload_length(tcp_size as u16);
            ip_packet.set_next_header(IpNextHeaderProtocols::Tcp);
            ip_packet.set_hop_limit(self.hop_limit);
            ip_packet.set_source(src_ip);
            ip_packet.set_destination(dst_ip);
        }

        {
            let mut tcp_packet = MutableTcpPacket::new(&mut buffer[40..]).ok_or(
                PacketBuilderError::BufferTooSmall {
                    needed: tcp_size,
                    available: buffer.len() - 40,
                },
            )?;
            tcp_packet.set_source(src_port);
            tcp_packet.set_destination(dst_port);
            tcp_packet.set_sequence(self.seq);
            tcp_packet.set_acknowledgement(0);
            tcp_packet.set_data_offset(5);
            tcp_packet.set_flags(flags.0);
            tcp_packet.set_window(self.window);
            let checksum = tcp_ipv6_checksum(&tcp_packet.to_immutable(), &src_ip, &dst_ip);
            tcp_packet.set_checksum(checksum);
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_flags_combine() {
        let syn_ack = TcpFlags::SYN.combine(TcpFlags::ACK);
        assert!(syn_ack.has(TcpFlags::SYN));
        assert!(syn_ack.has(TcpFlags::ACK));
        assert!(!syn_ack.has(TcpFlags::RST));
    }

    #[test]
    fn ipv4_builder_produces_well_formed_header() {
        let packet = TcpPacketBuilder::new()
            .source_ip(Ipv4Addr::new(10, 0, 0, 1))
            .dest_ip(Ipv4Addr::new(10, 0, 0, 2))
            .source_port(34952)
            .dest_port(80)
            .build(TcpFlags::ACK)
            .unwrap();

        assert_eq!(packet.len(), 40);
        assert_eq!(packet[0] >> 4, 4);
        assert_eq!(packet[9], 6);
    }

    #[test]
    fn ipv4_builder_rejects_missing_fields() {
        let result = TcpPacketBuilder::new()
            .source_ip(Ipv4Addr::new(10, 0, 0, 1))
            .build(TcpFlags::SYN);
        assert!(result.is_err());
    }

    #[test]
    fn ipv6_builder_produces_well_formed_header() {
        let packet = TcpV6PacketBuilder::new()
            .source_ip("2001:db8::1".parse().unwrap())
            .dest_ip("2001:db8::2".parse().unwrap())
            .source_port(34952)
            .dest_port(80)
            .build(TcpFlags::SYN)
            .unwrap();

        assert_eq!(packet.len(), 60);
        assert_eq!(packet[0] >> 4, 6);
    }
}
