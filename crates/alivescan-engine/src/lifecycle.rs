//! The end-to-end run sequence: socket init, target table construction,
//! capture open, sniffer spawn/warm-up, send, drain, join, and final
//! accounting.

use crate::error::{EngineError, EngineResult};
use crate::management::ManagementClient;
use crate::orchestrator::SenderOrchestrator;
use crate::queue::{cap_reached_message, deadhost_message, OutputQueue};
use crate::restriction::{AliveCapFlag, RestrictionController};
use crate::sniffer::{self, StartRendezvous, StopFlag};
use crate::tables::TargetTable;
use alivescan_net::capture::{filter_string, AliveCapture};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long the lifecycle controller waits for the sniffer's start
/// rendezvous before proceeding anyway.
const RENDEZVOUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay after the sniffer signals `Running` before probes are sent, to let
/// route/ARP caches warm up.
const WARMUP_DELAY: Duration = Duration::from_secs(2);

/// How long to wait for the sniffer to join after requesting a stop before
/// treating it as leaked.
const JOIN_GRACE: Duration = Duration::from_millis(500);

/// Summary of one completed run, for the CLI's human-readable report.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub targets_total: usize,
    pub alive_count: usize,
    pub dead_count: usize,
    pub targets_skipped: usize,
    pub scan_cap_reached: bool,
    pub alive_cap_reached: bool,
}

/// Run one alive-detection scan end to end against `client`'s configuration
/// and targets, publishing results to `queue`.
///
/// `consider_alive` bypasses sockets, capture, and the sniffer thread
/// entirely: there is no real reply to wait for, so every target is handed
/// straight to the restriction controller from this thread.
pub fn run<H>(client: &impl ManagementClient<H>, queue: Arc<dyn OutputQueue>) -> EngineResult<RunSummary>
where
    H: Send + Sync + 'static,
{
    let config = client.config().clone().validate().map_err(EngineError::from)?;
    let scan_id = client.scan_id().to_string();
    tracing::info!(scan_id = %scan_id, "scan starting");

    let targets = Arc::new(TargetTable::from_targets(client.targets()));
    let finish_published = Arc::new(AtomicBool::new(false));

    if config.methods.consider_alive {
        let summary = run_consider_alive(&targets, &config, queue.clone());
        publish_finish_if_needed(&queue, &finish_published);
        tracing::info!(scan_id = %scan_id, ?summary, "scan finished (consider-alive)");
        return Ok(summary);
    }

    let mut orchestrator = SenderOrchestrator::open(config.clone()).map_err(|e| {
        tracing::error!(error = %e, "socket initialization failed, aborting scan");
        publish_finish_if_needed(&queue, &finish_published);
        EngineError::from(e)
    })?;

    let capture = AliveCapture::open(config.interface.as_deref(), &filter_string(config.filter_port)).map_err(|e| {
        tracing::error!(error = %e, "capture open failed, aborting scan");
        publish_finish_if_needed(&queue, &finish_published);
        EngineError::from(e)
    })?;

    let alive_cap_flag = AliveCapFlag::new();
    let restriction = RestrictionController::new(
        config.max_scan_hosts,
        config.max_alive_hosts,
        alive_cap_flag.clone(),
        finish_published.clone(),
        queue.clone(),
    );

    let rendezvous = StartRendezvous::new();
    let stop_flag = StopFlag::new();
    let handle = sniffer::spawn(capture, targets.clone(), restriction, rendezvous.clone(), stop_flag);

    if !rendezvous.wait(RENDEZVOUS_TIMEOUT) {
        tracing::warn!("sniffer did not signal running within the rendezvous timeout; proceeding anyway");
    }
    std::thread::sleep(WARMUP_DELAY);

    let send_report = orchestrator.run(&targets, &alive_cap_flag);

    std::thread::sleep(Duration::from_millis(config.reply_drain_ms));

    handle.request_stop();
    let alive_table = handle.join_with_grace(JOIN_GRACE);
    let alive_cap_reached = alive_cap_flag.is_reached();

    let summary = match alive_table {
        Some(alive) => {
            let alive_count = alive.alive_count();
            let dead_count = alive.dead_count(&targets, send_report.targets_skipped);
            let scan_cap_reached = alive_count >= config.max_scan_hosts;

            if alive_cap_reached {
                publish_cap_notice(&queue, send_report.targets_skipped);
            }
            publish_dead_count(&queue, dead_count);

            RunSummary {
                targets_total: targets.len(),
                alive_count,
                dead_count,
                targets_skipped: send_report.targets_skipped,
                scan_cap_reached,
                alive_cap_reached,
            }
        }
        None => RunSummary {
            targets_total: targets.len(),
            targets_skipped: send_report.targets_skipped,
            alive_cap_reached,
            ..RunSummary::default()
        },
    };

    publish_finish_if_needed(&queue, &finish_published);
    tracing::info!(scan_id = %scan_id, ?summary, "scan finished");
    Ok(summary)
}

/// The `consider_alive` pseudo-method's entire run: every target is treated
/// as alive, synchronously, with no probe ever sent and no capture handle
/// ever opened.
fn run_consider_alive<H>(
    targets: &TargetTable<H>,
    config: &alivescan_core::ScanConfig,
    queue: Arc<dyn OutputQueue>,
) -> RunSummary {
    let alive_cap_flag = AliveCapFlag::new();
    let finish_published = Arc::new(AtomicBool::new(false));
    let mut restriction = RestrictionController::new(
        config.max_scan_hosts,
        config.max_alive_hosts,
        alive_cap_flag.clone(),
        finish_published,
        queue.clone(),
    );
    let mut alive = crate::tables::AliveTable::new();

    let mut handled = 0usize;
    targets.for_each_target(|addr, _probe, _handle| {
        if alive_cap_flag.is_reached() {
            return;
        }
        if alive.mark_alive(addr.clone()) {
            if let Err(e) = restriction.handle_alive(addr, &mut alive) {
                tracing::warn!(%addr, error = %e, "restriction controller failed during consider-alive");
            }
        }
        handled += 1;
    });

    let targets_skipped = targets.len().saturating_sub(handled);
    let alive_cap_reached = alive_cap_flag.is_reached();
    if alive_cap_reached {
        publish_cap_notice(&queue, targets_skipped);
    }
    let dead_count = alive.dead_count(targets, targets_skipped);
    publish_dead_count(&queue, dead_count);

    RunSummary {
        targets_total: targets.len(),
        alive_count: alive.alive_count(),
        dead_count,
        targets_skipped,
        scan_cap_reached: alive.alive_count() >= config.max_scan_hosts,
        alive_cap_reached,
    }
}

fn publish_finish_if_needed(queue: &Arc<dyn OutputQueue>, finish_published: &Arc<AtomicBool>) {
    if !finish_published.swap(true, Ordering::AcqRel) {
        if let Err(e) = queue.publish_finish() {
            tracing::warn!(error = %e, "failed to publish finish signal during teardown");
        }
    }
}

fn publish_cap_notice(queue: &Arc<dyn OutputQueue>, remaining: usize) {
    if let Err(e) = queue.publish_message("ERRMSG", &cap_reached_message(remaining)) {
        tracing::warn!(error = %e, "failed to publish cap-reached notice");
    }
}

fn publish_dead_count(queue: &Arc<dyn OutputQueue>, count: usize) {
    if let Err(e) = queue.publish_message("DEADHOST", &deadhost_message(count)) {
        tracing::warn!(error = %e, "failed to publish dead-host count");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RecordingQueue;
    use alivescan_core::{MethodSet, ScanConfig};
    use std::net::IpAddr;

    struct FixedClient {
        config: ScanConfig,
        targets: Vec<(IpAddr, ())>,
    }

    impl ManagementClient<()> for FixedClient {
        fn config(&self) -> &ScanConfig {
            &self.config
        }

        fn targets(&self) -> Vec<(IpAddr, ())> {
            self.targets.clone()
        }

        fn scan_id(&self) -> &str {
            "test-scan"
        }
    }

    #[test]
    fn consider_alive_publishes_every_target_without_a_capture_handle() {
        let config = ScanConfig {
            methods: MethodSet {
                consider_alive: true,
                ..MethodSet::empty()
            },
            ..ScanConfig::default()
        };
        let client = FixedClient {
            config,
            targets: vec![
                ("10.0.0.1".parse().unwrap(), ()),
                ("10.0.0.2".parse().unwrap(), ()),
            ],
        };
        let queue = Arc::new(RecordingQueue::new());
        let summary = run(&client, queue.clone()).unwrap();

        assert_eq!(summary.alive_count, 2);
        assert_eq!(summary.dead_count, 0);
        assert!(!summary.alive_cap_reached);
        assert!(queue.lines().contains(&"10.0.0.1".to_string()));
        assert!(queue.lines().contains(&"10.0.0.2".to_string()));
        assert_eq!(queue.finish_count(), 1);
    }

    #[test]
    fn consider_alive_honors_max_alive_hosts() {
        let config = ScanConfig {
            methods: MethodSet {
                consider_alive: true,
                ..MethodSet::empty()
            },
            max_scan_hosts: 1,
            max_alive_hosts: 1,
            ..ScanConfig::default()
        };
        let client = FixedClient {
            config,
            targets: vec![
                ("10.0.0.1".parse().unwrap(), ()),
                ("10.0.0.2".parse().unwrap(), ()),
            ],
        };
        let queue = Arc::new(RecordingQueue::new());
        let summary = run(&client, queue).unwrap();

        assert_eq!(summary.alive_count, 1);
        assert!(summary.alive_cap_reached);
        // The second target was never evaluated once the cap was hit, so it
        // is unknown, not dead.
        assert_eq!(summary.targets_skipped, 1);
        assert_eq!(summary.dead_count, 0);
    }

    #[test]
    fn empty_method_set_is_rejected_before_any_socket_work() {
        let client = FixedClient {
            config: ScanConfig::default(),
            targets: vec![],
        };
        let queue = Arc::new(RecordingQueue::new());
        assert!(run(&client, queue).is_err());
    }
}
