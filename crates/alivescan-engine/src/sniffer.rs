//! The capture consumer thread: classifies frames, extracts source
//! addresses, and drives the restriction controller as targets are observed
//! alive.
//!
//! This is the only thread that touches the alive table or the restriction
//! counters for the life of a run (see [`crate::restriction`]); the sender
//! thread only ever polls the shared [`crate::restriction::AliveCapFlag`].

use crate::restriction::RestrictionController;
use crate::tables::{AliveTable, TargetTable};
use alivescan_core::CanonicalAddr;
use alivescan_net::arp;
use alivescan_net::capture::{CapturedFrame, FrameKind, FrameSource};
use alivescan_net::icmpv4;
use alivescan_net::icmpv6::Icmpv6ResponseParser;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::Packet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// One-shot `Created -> Running` signal. The lifecycle controller blocks on
/// this before running the sender orchestrator, so no probe is ever emitted
/// before the capture handle is actually live.
#[derive(Default)]
pub struct StartRendezvous {
    ready: Mutex<bool>,
    condvar: Condvar,
}

impl StartRendezvous {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn signal(&self) {
        *self.ready.lock().expect("rendezvous mutex poisoned") = true;
        self.condvar.notify_all();
    }

    /// Block until the sniffer signals `Running`, or `timeout` elapses.
    /// Returns `false` on timeout; the caller treats that as capture
    /// initialization having stalled.
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self.ready.lock().expect("rendezvous mutex poisoned");
        let (guard, _) = self
            .condvar
            .wait_timeout_while(guard, timeout, |ready| !*ready)
            .expect("rendezvous mutex poisoned");
        *guard
    }
}

/// Cooperative `Running -> BreakRequested` signal, checked by the capture
/// loop between frames. Pcap's safe API has no cross-thread break beyond the
/// read timeout, so this is polled rather than interrupting a blocking read.
#[derive(Default)]
pub struct StopFlag(AtomicBool);

impl StopFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle to a running sniffer thread.
pub struct SnifferHandle {
    stop_flag: Arc<StopFlag>,
    join_handle: JoinHandle<AliveTable>,
}

impl SnifferHandle {
    pub fn request_stop(&self) {
        self.stop_flag.request_stop();
    }

    /// Poll for completion for up to `grace`, sleeping in small increments.
    /// Returns the finished sniffer's alive table, or `None` if it is still
    /// running when the grace period elapses — the emergency fallback is to
    /// log and leak the thread rather than force-cancel it (Rust has no safe
    /// thread-kill primitive).
    pub fn join_with_grace(self, grace: Duration) -> Option<AliveTable> {
        const POLL_INTERVAL: Duration = Duration::from_millis(20);
        let deadline = std::time::Instant::now() + grace;

        while std::time::Instant::now() < deadline {
            if self.join_handle.is_finished() {
                return self.join_handle.join().ok();
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        if self.join_handle.is_finished() {
            return self.join_handle.join().ok();
        }

        tracing::error!("sniffer thread did not join within the grace period; leaking it");
        None
    }
}

/// Spawn the sniffer thread. `targets` and `restriction` are moved in: the
/// alive table and restriction counters live exclusively on this thread for
/// the rest of the run. Generic over [`FrameSource`] so tests can drive this
/// loop with a fake, in-memory source instead of a real capture handle.
pub fn spawn<H, C>(
    mut capture: C,
    targets: Arc<TargetTable<H>>,
    mut restriction: RestrictionController,
    rendezvous: Arc<StartRendezvous>,
    stop_flag: Arc<StopFlag>,
) -> SnifferHandle
where
    H: Send + Sync + 'static,
    C: FrameSource + Send + 'static,
{
    let thread_stop_flag = stop_flag.clone();
    let join_handle = std::thread::spawn(move || {
        let mut alive = AliveTable::new();
        rendezvous.signal();
        tracing::info!("sniffer running");

        loop {
            match capture.next_frame() {
                Ok(Some(frame)) => {
                    // Mirrors the C liveness detector's `got_packet()`: once the
                    // alive cap is hit, every subsequent frame is dropped before
                    // any parsing, so the cap can never be overshot.
                    if !restriction.alive_cap_reached() {
                        if let Some(addr) = extract_source_addr(&frame) {
                            let canonical = CanonicalAddr::new(addr);
                            let was_new = alive.mark_alive(canonical.clone());
                            if was_new && targets.is_target(&canonical) {
                                if let Err(e) = restriction.handle_alive(&canonical, &mut alive) {
                                    tracing::warn!(%canonical, error = %e, "restriction controller failed");
                                }
                            }
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "capture read failed, stopping sniffer");
                    break;
                }
            }

            if thread_stop_flag.is_stopped() {
                break;
            }
        }

        tracing::info!("sniffer joined");
        alive
    });

    SnifferHandle { stop_flag, join_handle }
}

/// Classify a captured frame and extract its source address, if it carries
/// liveness evidence. ARP replies are evidence on their own; IPv4/IPv6
/// frames only count if the inner protocol is one the probe that elicited it
/// would recognize as a reply (ICMP echo reply, or any TCP segment — the
/// capture filter already restricts TCP to replies on the fixed source
/// port).
fn extract_source_addr(frame: &CapturedFrame) -> Option<IpAddr> {
    match FrameKind::from(frame.ether_type) {
        FrameKind::Ipv4 => extract_ipv4_source(&frame.payload),
        FrameKind::Ipv6 => extract_ipv6_source(&frame.payload),
        FrameKind::Arp => arp::parse_reply(&frame.payload).map(|reply| IpAddr::V4(reply.sender_ip)),
        FrameKind::Other(_) => None,
    }
}

fn extract_ipv4_source(payload: &[u8]) -> Option<IpAddr> {
    let packet = Ipv4Packet::new(payload)?;
    let is_evidence = match packet.get_next_level_protocol() {
        IpNextHeaderProtocols::Icmp => icmpv4::is_liveness_evidence(packet.payload()),
        IpNextHeaderProtocols::Tcp => true,
        _ => false,
    };
    is_evidence.then(|| IpAddr::V4(packet.get_source()))
}

fn extract_ipv6_source(payload: &[u8]) -> Option<IpAddr> {
    let packet = Ipv6Packet::new(payload)?;
    let is_evidence = match packet.get_next_header() {
        IpNextHeaderProtocols::Icmpv6 => Icmpv6ResponseParser::is_liveness_evidence(packet.payload()),
        IpNextHeaderProtocols::Tcp => true,
        _ => false,
    };
    is_evidence.then(|| IpAddr::V6(packet.get_source()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::packet::icmp::{IcmpCode, IcmpTypes, MutableIcmpPacket};
    use pnet::packet::ipv4::MutableIpv4Packet;
    use std::net::Ipv4Addr;

    fn ipv4_icmp_echo_reply(src: Ipv4Addr, dst: Ipv4Addr) -> Vec<u8> {
        let mut buffer = vec![0u8; 28];
        {
            let mut ip = MutableIpv4Packet::new(&mut buffer[..20]).unwrap();
            ip.set_version(4);
            ip.set_header_length(5);
            ip.set_total_length(28);
            ip.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
            ip.set_source(src);
            ip.set_destination(dst);
        }
        {
            let mut icmp = MutableIcmpPacket::new(&mut buffer[20..]).unwrap();
            icmp.set_icmp_type(IcmpTypes::EchoReply);
            icmp.set_icmp_code(IcmpCode::new(0));
        }
        buffer
    }

    #[test]
    fn extracts_source_from_icmpv4_echo_reply() {
        let src = Ipv4Addr::new(10, 0, 0, 5);
        let payload = ipv4_icmp_echo_reply(src, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(extract_ipv4_source(&payload), Some(IpAddr::V4(src)));
    }

    #[test]
    fn rejects_non_liveness_icmpv4_types() {
        let mut payload = ipv4_icmp_echo_reply(Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 1));
        payload[20] = 11; // Time Exceeded
        assert_eq!(extract_ipv4_source(&payload), None);
    }

    /// A fake [`FrameSource`] that hands out a fixed sequence of frames and
    /// then reports nothing, standing in for a real capture handle (which
    /// needs raw-socket privilege to open) so the sniffer thread's reply
    /// handling can be driven end to end in tests.
    struct FakeFrameSource {
        frames: std::collections::VecDeque<CapturedFrame>,
    }

    impl FrameSource for FakeFrameSource {
        fn next_frame(&mut self) -> alivescan_core::Result<Option<CapturedFrame>> {
            Ok(self.frames.pop_front())
        }
    }

    fn ipv4_tcp_segment(src: Ipv4Addr, dst: Ipv4Addr) -> Vec<u8> {
        let mut buffer = vec![0u8; 20];
        let mut ip = MutableIpv4Packet::new(&mut buffer).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length(20);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
        ip.set_source(src);
        ip.set_destination(dst);
        drop(ip);
        buffer
    }

    fn arp_reply_payload(sender_ip: Ipv4Addr) -> Vec<u8> {
        use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, MutableArpPacket};
        use pnet::packet::ethernet::EtherTypes;
        use pnet::util::MacAddr;

        let mut buffer = vec![0u8; 28];
        let mut packet = MutableArpPacket::new(&mut buffer).unwrap();
        packet.set_hardware_type(ArpHardwareTypes::Ethernet);
        packet.set_protocol_type(EtherTypes::Ipv4);
        packet.set_hw_addr_len(6);
        packet.set_proto_addr_len(4);
        packet.set_operation(ArpOperations::Reply);
        packet.set_sender_hw_addr(MacAddr::new(0xAA, 0xBB, 0xCC, 0, 0, 1));
        packet.set_sender_proto_addr(sender_ip);
        packet.set_target_hw_addr(MacAddr::new(0, 1, 2, 3, 4, 5));
        packet.set_target_proto_addr(Ipv4Addr::new(10, 0, 0, 1));
        drop(packet);
        buffer
    }

    #[test]
    fn sniffer_marks_hosts_alive_from_icmp_tcp_and_arp_frames() {
        use crate::queue::RecordingQueue;
        use crate::restriction::{AliveCapFlag, RestrictionController};
        use std::sync::atomic::AtomicBool;

        let icmp_src = Ipv4Addr::new(10, 0, 0, 5);
        let tcp_src = Ipv4Addr::new(10, 0, 0, 6);
        let arp_src = Ipv4Addr::new(10, 0, 0, 7);
        let local = Ipv4Addr::new(10, 0, 0, 1);

        let frames = std::collections::VecDeque::from(vec![
            CapturedFrame {
                ether_type: 0x0800,
                payload: ipv4_icmp_echo_reply(icmp_src, local),
            },
            CapturedFrame {
                ether_type: 0x0800,
                payload: ipv4_tcp_segment(tcp_src, local),
            },
            CapturedFrame {
                ether_type: 0x0806,
                payload: arp_reply_payload(arp_src),
            },
        ]);

        let targets = Arc::new(TargetTable::from_targets(vec![
            (IpAddr::V4(icmp_src), ()),
            (IpAddr::V4(tcp_src), ()),
            (IpAddr::V4(arp_src), ()),
        ]));

        let queue = Arc::new(RecordingQueue::new());
        let restriction = RestrictionController::new(
            10,
            10,
            AliveCapFlag::new(),
            Arc::new(AtomicBool::new(false)),
            queue.clone(),
        );

        let rendezvous = StartRendezvous::new();
        let stop_flag = StopFlag::new();
        let handle = spawn(
            FakeFrameSource { frames },
            targets,
            restriction,
            rendezvous.clone(),
            stop_flag.clone(),
        );

        assert!(rendezvous.wait(Duration::from_secs(1)));
        std::thread::sleep(Duration::from_millis(50));
        stop_flag.request_stop();
        let alive = handle.join_with_grace(Duration::from_secs(1)).unwrap();

        assert_eq!(alive.alive_count(), 3);
        let lines = queue.lines();
        assert!(lines.contains(&icmp_src.to_string()));
        assert!(lines.contains(&tcp_src.to_string()));
        assert!(lines.contains(&arp_src.to_string()));
    }

    #[test]
    fn start_rendezvous_signals_waiters() {
        let rendezvous = StartRendezvous::new();
        let signalled = rendezvous.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            signalled.signal();
        });
        assert!(rendezvous.wait(Duration::from_secs(1)));
    }

    #[test]
    fn start_rendezvous_times_out_without_signal() {
        let rendezvous = StartRendezvous::new();
        assert!(!rendezvous.wait(Duration::from_millis(20)));
    }
}
