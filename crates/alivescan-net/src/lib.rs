//! Packet crafting, raw sockets, and libpcap-based capture for the
//! alive-detection engine.
//!
//! # Examples
//!
//! ```no_run
//! use alivescan_net::{capture::AliveCapture, privilege::check_privileges};
//!
//! check_privileges().expect("insufficient privileges for raw socket access");
//!
//! let filter = alivescan_net::capture::filter_string(34952);
//! let mut capture = AliveCapture::open(None, &filter).unwrap();
//! if let Some(frame) = capture.next_frame().unwrap() {
//!     println!("captured {} bytes", frame.payload.len());
//! }
//! ```

pub mod arp;
pub mod capture;
pub mod icmpv4;
pub mod icmpv6;
pub mod interface;
pub mod packet_builder;
pub mod privilege;
pub mod socket;

pub use arp::{ArpReply, ArpRequest};
#[cfg(target_os = "linux")]
pub use arp::ArpSocket;
pub use capture::{filter_string, AliveCapture, CapturedFrame, FrameKind, FrameSource};
pub use icmpv4::Icmpv4EchoRequest;
pub use icmpv6::{Icmpv6PacketBuilder, Icmpv6ResponseParser};
pub use packet_builder::{TcpFlags, TcpPacketBuilder, TcpV6PacketBuilder};
pub use privilege::{check_privileges, drop_privileges, has_raw_socket_capability};
pub use socket::RawSocket;
