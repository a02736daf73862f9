//! Target specification parsing.
//!
//! Accepts the subset of nmap-style target syntax that makes sense for a
//! liveness probe: single addresses and CIDR blocks. Hostnames are resolved
//! through the system resolver, same as the teacher's target parser, but
//! liveness detection has no use for port ranges or exclusion lists, so
//! those are not carried over.

use ipnetwork::IpNetwork;
use std::net::{IpAddr, ToSocketAddrs};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("invalid target '{spec}': {reason}")]
    Invalid { spec: String, reason: String },
}

/// Expand one CLI target token into the addresses it names.
///
/// - A bare address expands to itself.
/// - A CIDR block expands to every host address it contains (network and
///   broadcast addresses included for point-to-point and /31 links, same as
///   the teacher's CIDR expansion).
/// - Anything else is resolved as a hostname; all addresses the resolver
///   returns are included.
pub fn expand(spec: &str) -> Result<Vec<IpAddr>, TargetError> {
    if let Ok(addr) = spec.parse::<IpAddr>() {
        return Ok(vec![addr]);
    }

    if let Ok(network) = spec.parse::<IpNetwork>() {
        let addrs = match network {
            IpNetwork::V4(v4) => v4.iter().map(IpAddr::V4).collect(),
            IpNetwork::V6(v6) => v6.iter().map(IpAddr::V6).collect(),
        };
        return Ok(addrs);
    }

    resolve_hostname(spec)
}

fn resolve_hostname(spec: &str) -> Result<Vec<IpAddr>, TargetError> {
    let lookup = format!("{spec}:0");
    let addrs: Vec<IpAddr> = lookup
        .to_socket_addrs()
        .map_err(|e| TargetError::Invalid {
            spec: spec.to_string(),
            reason: e.to_string(),
        })?
        .map(|s| s.ip())
        .collect();

    if addrs.is_empty() {
        return Err(TargetError::Invalid {
            spec: spec.to_string(),
            reason: "resolver returned no addresses".to_string(),
        });
    }

    Ok(addrs)
}

/// Expand every token in `specs`, deduplicating while preserving first-seen
/// order so the sender's burst pacing stays deterministic across runs.
pub fn expand_all(specs: &[String]) -> Result<Vec<IpAddr>, TargetError> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for spec in specs {
        for addr in expand(spec)? {
            if seen.insert(addr) {
                out.push(addr);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_bare_address() {
        let addrs = expand("192.168.1.1").unwrap();
        assert_eq!(addrs, vec!["192.168.1.1".parse::<IpAddr>().unwrap()]);
    }

    #[test]
    fn expands_cidr_block() {
        let addrs = expand("10.0.0.0/30").unwrap();
        assert_eq!(addrs.len(), 4);
    }

    #[test]
    fn expand_all_deduplicates_preserving_order() {
        let specs = vec!["10.0.0.1".to_string(), "10.0.0.0/30".to_string()];
        let addrs = expand_all(&specs).unwrap();
        assert_eq!(addrs[0], "10.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(addrs.len(), 4);
    }

    #[test]
    fn rejects_unresolvable_host() {
        let err = expand("this-host-does-not-resolve.invalid").unwrap_err();
        assert!(matches!(err, TargetError::Invalid { .. }));
    }
}
