//! The sniffer thread's receive side: a single BPF-filtered libpcap handle
//! opened on "any" interface (or a named one), non-promiscuous, with a short
//! read timeout so the sniffer can observe a cooperative stop flag between
//! packets instead of blocking forever.

use alivescan_core::Error;
use pcap::{Active, Capture, Linktype};

pub type Result<T> = std::result::Result<T, Error>;

const SNAPLEN: i32 = 1500;
const READ_TIMEOUT_MS: i32 = 100;

/// One captured frame with its link-layer header already stripped.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// EtherType of the payload (0x0800 IPv4, 0x0806 ARP, 0x86DD IPv6).
    pub ether_type: u16,
    /// The frame's payload, starting at the IPv4/IPv6/ARP header.
    pub payload: Vec<u8>,
}

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_ARP: u16 = 0x0806;
const ETHERTYPE_IPV6: u16 = 0x86DD;

/// A source of captured frames the sniffer thread consumes. Abstracts over
/// [`AliveCapture`] so the sniffer's frame-classification and
/// restriction-handling logic can be driven by a fake, in-memory source in
/// tests instead of a real libpcap handle, which needs raw-socket privilege
/// to open.
pub trait FrameSource {
    /// Block for up to the implementation's own read timeout for the next
    /// matching frame. `Ok(None)` means nothing arrived within that window,
    /// which is the sniffer's cue to check its stop flag and loop again.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>>;
}

/// A BPF-filtered capture handle dispatching on the reported link type
/// instead of assuming a fixed header length.
pub struct AliveCapture {
    capture: Capture<Active>,
    link_type: Linktype,
}

impl FrameSource for AliveCapture {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
        AliveCapture::next_frame(self)
    }
}

impl AliveCapture {
    /// Open a capture handle and install `filter` on it. `interface` of
    /// `None` opens the pseudo-device "any", which on Linux yields
    /// Linux-cooked-capture (SLL) frames rather than Ethernet ones.
    pub fn open(interface: Option<&str>, filter: &str) -> Result<Self> {
        let device = interface.unwrap_or("any");
        let mut capture = Capture::from_device(device)
            .map_err(|e| Error::Capture(format!("no such device {device}: {e}")))?
            .promisc(false)
            .snaplen(SNAPLEN)
            .timeout(READ_TIMEOUT_MS)
            .open()
            .map_err(|e| Error::Capture(format!("failed to open capture on {device}: {e}")))?;

        capture
            .filter(filter, true)
            .map_err(|e| Error::Capture(format!("failed to install filter {filter:?}: {e}")))?;

        let link_type = capture.get_datalink();
        tracing::debug!(%device, ?link_type, %filter, "capture handle opened");

        Ok(Self { capture, link_type })
    }

    /// Block for up to the read timeout for the next matching frame.
    /// `Ok(None)` means the timeout elapsed with nothing captured, which is
    /// the sniffer's cue to check its stop flag and loop again.
    pub fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
        match self.capture.next_packet() {
            Ok(packet) => Ok(Self::strip_link_header(self.link_type, packet.data)),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(Error::Capture(format!("capture read failed: {e}"))),
        }
    }

    fn strip_link_header(link_type: Linktype, data: &[u8]) -> Option<CapturedFrame> {
        match link_type {
            Linktype::ETHERNET => {
                if data.len() < 14 {
                    return None;
                }
                let ether_type = u16::from_be_bytes([data[12], data[13]]);
                Some(CapturedFrame {
                    ether_type,
                    payload: data[14..].to_vec(),
                })
            }
            Linktype::LINUX_SLL => {
                if data.len() < 16 {
                    return None;
                }
                let ether_type = u16::from_be_bytes([data[14], data[15]]);
                Some(CapturedFrame {
                    ether_type,
                    payload: data[16..].to_vec(),
                })
            }
            other => {
                tracing::warn!(?other, "unsupported link type, dropping frame");
                None
            }
        }
    }
}

/// Known EtherType values the sniffer dispatches the stripped payload on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Ipv4,
    Ipv6,
    Arp,
    Other(u16),
}

impl From<u16> for FrameKind {
    fn from(ether_type: u16) -> Self {
        match ether_type {
            ETHERTYPE_IPV4 => FrameKind::Ipv4,
            ETHERTYPE_IPV6 => FrameKind::Ipv6,
            ETHERTYPE_ARP => FrameKind::Arp,
            other => FrameKind::Other(other),
        }
    }
}

/// Builds the fixed BPF filter string the capture handle installs: ICMPv6
/// echo reply, ICMPv4 echo reply, TCP destined for the engine's fixed source
/// port, or ARP reply — nothing else ever reaches the sniffer, so the
/// userspace reply-type checks only need to reconfirm what the filter
/// already guarantees.
pub fn filter_string(filter_port: u16) -> String {
    format!(
        "(ip6 or ip or arp) and (ip6[40] = 129 or icmp[icmptype] = icmp-echoreply or dst port {filter_port} or arp[6:2] = 2)"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_kind_maps_known_ethertypes() {
        assert_eq!(FrameKind::from(0x0800), FrameKind::Ipv4);
        assert_eq!(FrameKind::from(0x86DD), FrameKind::Ipv6);
        assert_eq!(FrameKind::from(0x0806), FrameKind::Arp);
        assert_eq!(FrameKind::from(0x1234), FrameKind::Other(0x1234));
    }

    #[test]
    fn filter_string_references_the_fixed_port() {
        let filter = filter_string(34952);
        assert!(filter.contains("34952"));
        assert!(filter.contains("icmp"));
        assert!(filter.contains("arp"));
    }

    #[test]
    fn strip_link_header_rejects_truncated_ethernet_frame() {
        let short = [0u8; 10];
        assert!(AliveCapture::strip_link_header(Linktype::ETHERNET, &short).is_none());
    }

    #[test]
    fn strip_link_header_reads_ethertype_at_offset_12() {
        let mut frame = vec![0u8; 20];
        frame[12] = 0x08;
        frame[13] = 0x00;
        let parsed = AliveCapture::strip_link_header(Linktype::ETHERNET, &frame).unwrap();
        assert_eq!(parsed.ether_type, ETHERTYPE_IPV4);
        assert_eq!(parsed.payload.len(), 6);
    }

    #[test]
    fn strip_link_header_reads_ethertype_at_offset_14_for_sll() {
        let mut frame = vec![0u8; 24];
        frame[14] = 0x08;
        frame[15] = 0x06;
        let parsed = AliveCapture::strip_link_header(Linktype::LINUX_SLL, &frame).unwrap();
        assert_eq!(parsed.ether_type, ETHERTYPE_ARP);
        assert_eq!(parsed.payload.len(), 8);
    }
}
