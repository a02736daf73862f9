//! ICMPv4 echo request construction and echo reply parsing.
//!
//! ICMPv4 checksums cover only the ICMP message itself; unlike ICMPv6 there
//! is no pseudo-header contribution from the IP addresses.

use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpTypes, MutableIcmpPacket};
use pnet::packet::Packet;

use alivescan_core::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Builds an ICMPv4 echo request with the identifier/sequence pair the
/// sniffer uses to recognize its own replies.
#[derive(Debug, Clone)]
pub struct Icmpv4EchoRequest {
    identifier: u16,
    sequence: u16,
    payload: Vec<u8>,
}

impl Icmpv4EchoRequest {
    pub fn new(identifier: u16, sequence: u16, payload: Vec<u8>) -> Self {
        Self {
            identifier,
            sequence,
            payload,
        }
    }

    /// Serialize to a complete ICMPv4 packet (type, code, checksum, id/seq, payload).
    pub fn build(self) -> Result<Vec<u8>> {
        let total_len = 8 + self.payload.len();
        let mut buffer = vec![0u8; total_len];

        {
            let mut packet = MutableIcmpPacket::new(&mut buffer)
                .ok_or_else(|| Error::Send {
                    dst: "icmpv4".to_string(),
                    kind: alivescan_core::SocketKind::IcmpV4,
                    reason: "buffer too small for echo request".to_string(),
                })?;
            packet.set_icmp_type(IcmpTypes::EchoRequest);
            packet.set_icmp_code(IcmpCode::new(0));
            packet.set_payload(&echo_body(self.identifier, self.sequence, &self.payload));
            packet.set_checksum(0);
        }

        let checksum = icmp::checksum(&IcmpPacket::new(&buffer).expect("buffer sized above"));
        let mut packet = MutableIcmpPacket::new(&mut buffer).expect("buffer sized above");
        packet.set_checksum(checksum);

        Ok(buffer)
    }
}

fn echo_body(identifier: u16, sequence: u16, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + data.len());
    body.extend_from_slice(&identifier.to_be_bytes());
    body.extend_from_slice(&sequence.to_be_bytes());
    body.extend_from_slice(data);
    body
}

/// Parses an ICMPv4 echo reply, returning the identifier and sequence so the
/// caller can correlate it against the request that was sent.
pub fn parse_echo_reply(packet: &[u8]) -> Option<(u16, u16)> {
    let reply = EchoReplyPacket::new(packet)?;
    let payload = reply.payload();
    if payload.len() < 4 {
        return None;
    }
    let identifier = u16::from_be_bytes([payload[0], payload[1]]);
    let sequence = u16::from_be_bytes([payload[2], payload[3]]);
    Some((identifier, sequence))
}

/// True if the packet's ICMP type is Echo Reply (0), the only ICMPv4 type the
/// sniffer treats as liveness evidence. The capture filter already restricts
/// ICMP frames to this type; this is a second check against the parsed type.
pub fn is_liveness_evidence(packet: &[u8]) -> bool {
    match IcmpPacket::new(packet) {
        Some(p) => p.get_icmp_type() == IcmpTypes::EchoReply,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_request_has_correct_type_and_nonzero_checksum() {
        let packet = Icmpv4EchoRequest::new(1, 1, vec![0xAB, 0xCD])
            .build()
            .unwrap();
        assert_eq!(packet[0], 8); // Echo Request
        assert_eq!(packet[1], 0);
        let checksum = u16::from_be_bytes([packet[2], packet[3]]);
        assert_ne!(checksum, 0);
    }

    #[test]
    fn echo_request_encodes_identifier_and_sequence() {
        let packet = Icmpv4EchoRequest::new(0x1234, 0x0007, vec![]).build().unwrap();
        assert_eq!(&packet[4..6], &0x1234u16.to_be_bytes());
        assert_eq!(&packet[6..8], &0x0007u16.to_be_bytes());
    }

    #[test]
    fn liveness_evidence_accepts_only_echo_reply() {
        let mut echo_reply = vec![0u8; 8];
        echo_reply[0] = 0; // Echo Reply
        assert!(is_liveness_evidence(&echo_reply));

        let mut unreachable = vec![0u8; 8];
        unreachable[0] = 3; // Destination Unreachable, not treated as alive evidence
        assert!(!is_liveness_evidence(&unreachable));

        let mut other = vec![0u8; 8];
        other[0] = 11; // Time Exceeded, not treated as alive evidence
        assert!(!is_liveness_evidence(&other));
    }
}
