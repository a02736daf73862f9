//! Network interface enumeration and per-target route/source-address
//! selection, used both to pick the egress interface for a raw send and to
//! decide which interface the capture handle should listen on.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;

use pnet::datalink;

/// Errors that can occur during interface operations
#[derive(Error, Debug)]
pub enum InterfaceError {
    /// No suitable interface found
    #[error("No suitable network interface found for target {0}")]
    NoInterfaceFound(IpAddr),

    /// Failed to enumerate interfaces
    #[error("Failed to enumerate network interfaces: {0}")]
    EnumerationFailed(String),

    /// Interface has no suitable addresses
    #[error("Interface {0} has no suitable addresses")]
    NoAddresses(String),

    /// Invalid interface specification
    #[error("Invalid interface specification: {0}")]
    InvalidInterface(String),
}

impl From<InterfaceError> for alivescan_core::Error {
    fn from(err: InterfaceError) -> Self {
        alivescan_core::Error::Config(err.to_string())
    }
}

/// Network interface information
#[derive(Debug, Clone)]
pub struct NetworkInterface {
    /// Interface name (e.g., "eth0", "wlan0")
    pub name: String,

    /// Hardware (MAC) address
    pub mac_address: Option<Vec<u8>>,

    /// IPv4 addresses assigned to this interface
    pub ipv4_addresses: Vec<Ipv4Addr>,

    /// IPv6 addresses assigned to this interface
    pub ipv6_addresses: Vec<Ipv6Addr>,

    /// Maximum transmission unit
    pub mtu: Option<usize>,

    /// Whether interface is up
    pub is_up: bool,

    /// Whether interface is loopback
    pub is_loopback: bool,
}

impl NetworkInterface {
    /// Check if interface has any IPv4 addresses
    pub fn has_ipv4(&self) -> bool {
        !self.ipv4_addresses.is_empty()
    }

    /// Check if interface has any IPv6 addresses
    pub fn has_ipv6(&self) -> bool {
        !self.ipv6_addresses.is_empty()
    }

    /// Get the first IPv4 address, if available
    pub fn first_ipv4(&self) -> Option<Ipv4Addr> {
        self.ipv4_addresses.first().copied()
    }

    /// Get the first IPv6 address, if available
    pub fn first_ipv6(&self) -> Option<Ipv6Addr> {
        self.ipv6_addresses.first().copied()
    }

    /// Get appropriate source IP for a target
    pub fn get_source_ip_for(&self, target: IpAddr) -> Option<IpAddr> {
        match target {
            IpAddr::V4(_) => self.first_ipv4().map(IpAddr::V4),
            IpAddr::V6(_) => self.first_ipv6().map(IpAddr::V6),
        }
    }
}

/// Enumerate all available network interfaces
///
/// # Examples
///
/// ```no_run
/// use alivescan_net::interface::enumerate_interfaces;
///
/// match enumerate_interfaces() {
///     Ok(interfaces) => {
///         for iface in interfaces {
///             println!("Interface: {} ({})", iface.name,
///                      if iface.is_up { "UP" } else { "DOWN" });
///         }
///     }
///     Err(e) => eprintln!("Failed to enumerate interfaces: {}", e),
/// }
/// ```
pub fn enumerate_interfaces() -> Result<Vec<NetworkInterface>, InterfaceError> {
    let interfaces = datalink::interfaces();

    let mut result = Vec::new();

    for iface in interfaces {
        let mut ipv4_addresses = Vec::new();
        let mut ipv6_addresses = Vec::new();

        // Extract IP addresses
        for ip_network in iface.ips.iter() {
            match ip_network.ip() {
                IpAddr::V4(ipv4) => ipv4_addresses.push(ipv4),
                IpAddr::V6(ipv6) => {
                    // Skip link-local IPv6 addresses (fe80::/10) as they're not routable
                    // Using manual check for MSRV compatibility (Rust 1.70)
                    let octets = ipv6.octets();
                    let is_link_local = octets[0] == 0xfe && (octets[1] & 0xc0) == 0x80;
                    if !is_link_local {
                        ipv6_addresses.push(ipv6);
                    }
                }
            }
        }

        result.push(NetworkInterface {
            name: iface.name.clone(),
            mac_address: iface.mac.map(|mac| mac.octets().to_vec()),
            ipv4_addresses,
            ipv6_addresses,
            mtu: Some(iface.index as usize), // pnet doesn't expose MTU directly
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
        });
    }

    Ok(result)
}

/// Find the best interface for reaching a target IP
///
/// This performs simple routing logic:
/// 1. If target is on same subnet as any interface, use that interface
/// 2. Otherwise, use the default gateway interface
/// 3. Prefer non-loopback interfaces
/// 4. Match IPv4/IPv6 address families
///
/// # Arguments
///
/// * `target` - Target IP address to route to
///
/// # Examples
///
/// ```no_run
/// use std::net::IpAddr;
/// use alivescan_net::interface::find_interface_for_target;
///
/// let target: IpAddr = "8.8.8.8".parse().unwrap();
/// match find_interface_for_target(target) {
///     Ok(iface) => println!("Using interface: {}", iface.name),
///     Err(e) => eprintln!("No suitable interface: {}", e),
/// }
/// ```
pub fn find_interface_for_target(target: IpAddr) -> Result<NetworkInterface, InterfaceError> {
    let interfaces = enumerate_interfaces()?;

    // Filter to interfaces that are up and have addresses
    let mut candidates: Vec<_> = interfaces
        .into_iter()
        .filter(|iface| iface.is_up && !iface.is_loopback)
        .collect();

    // If no non-loopback interfaces, allow loopback
    if candidates.is_empty() {
        candidates = enumerate_interfaces()?
            .into_iter()
            .filter(|iface| iface.is_up)
            .collect();
    }

    // Find interface matching address family with addresses
    let matching: Vec<_> = candidates
        .into_iter()
        .filter(|iface| match target {
            IpAddr::V4(_) => iface.has_ipv4(),
            IpAddr::V6(_) => iface.has_ipv6(),
        })
        .collect();

    matching
        .into_iter()
        .next()
        .ok_or(InterfaceError::NoInterfaceFound(target))
}

/// Get the source IP to use when scanning a target
///
/// This is a convenience function that combines interface detection
/// with source IP selection.
///
/// # Arguments
///
/// * `target` - Target IP address
///
/// # Examples
///
/// ```no_run
/// use std::net::IpAddr;
/// use alivescan_net::interface::get_source_ip_for_target;
///
/// let target: IpAddr = "192.168.1.1".parse().unwrap();
/// match get_source_ip_for_target(target) {
///     Ok(source) => println!("Using source IP: {}", source),
///     Err(e) => eprintln!("Failed to determine source IP: {}", e),
/// }
/// ```
pub fn get_source_ip_for_target(target: IpAddr) -> Result<IpAddr, InterfaceError> {
    let interface = find_interface_for_target(target)?;

    interface
        .get_source_ip_for(target)
        .ok_or_else(|| InterfaceError::NoAddresses(interface.name.clone()))
}

/// Find interface by name
///
/// # Arguments
///
/// * `name` - Interface name (e.g., "eth0")
///
/// # Examples
///
/// ```no_run
/// use alivescan_net::interface::find_interface_by_name;
///
/// match find_interface_by_name("eth0") {
///     Ok(iface) => println!("Found interface: {:?}", iface),
///     Err(e) => eprintln!("Interface not found: {}", e),
/// }
/// ```
pub fn find_interface_by_name(name: &str) -> Result<NetworkInterface, InterfaceError> {
    let interfaces = enumerate_interfaces()?;

    interfaces
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| InterfaceError::InvalidInterface(name.to_string()))
}
