//! The upstream management-client interface.
//!
//! This is the engine's read-only view of whatever drives it: the resolved
//! configuration, the target list, and an opaque scan id for log context.
//! `alivescan-cli` supplies a local implementation backed by parsed CLI
//! arguments; the real management protocol client is out of scope here.

use alivescan_core::ScanConfig;
use std::net::IpAddr;

/// Supplies configuration and targets to a single engine run.
pub trait ManagementClient<H> {
    /// The resolved, already-validated configuration for this run.
    fn config(&self) -> &ScanConfig;

    /// The targets for this run, each with its caller-owned opaque handle.
    fn targets(&self) -> Vec<(IpAddr, H)>;

    /// An opaque identifier for this scan, used only for log context.
    fn scan_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alivescan_core::MethodSet;

    struct FixedClient {
        config: ScanConfig,
        targets: Vec<(IpAddr, ())>,
        scan_id: String,
    }

    impl ManagementClient<()> for FixedClient {
        fn config(&self) -> &ScanConfig {
            &self.config
        }

        fn targets(&self) -> Vec<(IpAddr, ())> {
            self.targets.clone()
        }

        fn scan_id(&self) -> &str {
            &self.scan_id
        }
    }

    #[test]
    fn fixed_client_exposes_config_and_targets() {
        let client = FixedClient {
            config: ScanConfig {
                methods: MethodSet {
                    icmp: true,
                    ..MethodSet::empty()
                },
                ..ScanConfig::default()
            },
            targets: vec![("10.0.0.1".parse().unwrap(), ())],
            scan_id: "scan-1".to_string(),
        };

        assert!(client.config().methods.icmp);
        assert_eq!(client.targets().len(), 1);
        assert_eq!(client.scan_id(), "scan-1");
    }
}
