//! The CLI's [`ManagementClient`] implementation: a fixed configuration and
//! target list resolved once at startup.

use alivescan_core::ScanConfig;
use alivescan_engine::ManagementClient;
use std::net::IpAddr;

pub struct CliClient {
    config: ScanConfig,
    targets: Vec<IpAddr>,
    scan_id: String,
}

impl CliClient {
    pub fn new(config: ScanConfig, targets: Vec<IpAddr>, scan_id: String) -> Self {
        Self {
            config,
            targets,
            scan_id,
        }
    }
}

impl ManagementClient<()> for CliClient {
    fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn targets(&self) -> Vec<(IpAddr, ())> {
        self.targets.iter().map(|&addr| (addr, ())).collect()
    }

    fn scan_id(&self) -> &str {
        &self.scan_id
    }
}
