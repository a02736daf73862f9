//! Max-scan-hosts / max-alive-hosts enforcement.
//!
//! Counters are single-writer (the sniffer thread owns this controller
//! exclusively); `alive_cap_reached` is additionally exposed through a
//! shared atomic so the sender thread can poll it between targets without
//! taking a lock on the capture callback's hot path.

use crate::queue::OutputQueue;
use crate::tables::AliveTable;
use alivescan_core::{CanonicalAddr, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// The `alive_cap_reached` flag, shared between the sniffer thread (sole
/// writer) and the sender thread (reader, polled between targets).
#[derive(Default)]
pub struct AliveCapFlag(AtomicBool);

impl AliveCapFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_reached(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Owns the restriction counters and publishing decisions for one run.
pub struct RestrictionController {
    max_scan_hosts: usize,
    max_alive_hosts: usize,
    alive_count: usize,
    scan_cap_reached: bool,
    alive_cap_flag: Arc<AliveCapFlag>,
    finish_published: Arc<AtomicBool>,
    queue: Arc<dyn OutputQueue>,
}

impl RestrictionController {
    pub fn new(
        max_scan_hosts: usize,
        max_alive_hosts: usize,
        alive_cap_flag: Arc<AliveCapFlag>,
        finish_published: Arc<AtomicBool>,
        queue: Arc<dyn OutputQueue>,
    ) -> Self {
        Self {
            max_scan_hosts,
            max_alive_hosts,
            alive_count: 0,
            scan_cap_reached: false,
            alive_cap_flag,
            finish_published,
            queue,
        }
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    pub fn scan_cap_reached(&self) -> bool {
        self.scan_cap_reached
    }

    pub fn alive_cap_reached(&self) -> bool {
        self.alive_cap_flag.is_reached()
    }

    /// Handle one freshly-observed target going alive. Only call this when
    /// `AliveTable::mark_alive` returned `true` for a target address.
    ///
    /// Cap crossings are detected with `>=`/`>` rather than `==`, so that a
    /// `max_scan_hosts` or `max_alive_hosts` of `0` takes effect on the very
    /// first alive detection instead of never firing (an exact-equality
    /// check never sees `1 == 0`).
    pub fn handle_alive(&mut self, addr: &CanonicalAddr, alive_table: &mut AliveTable) -> Result<()> {
        self.alive_count += 1;

        if self.scan_cap_reached {
            alive_table.defer(addr.clone());
        } else if self.alive_count > self.max_scan_hosts {
            self.scan_cap_reached = true;
            self.publish_finish_once();
            alive_table.defer(addr.clone());
        } else {
            if let Err(e) = self.queue.publish_host(addr.as_str()) {
                tracing::warn!(%addr, error = %e, "failed to publish alive host");
            }
            if self.alive_count >= self.max_scan_hosts {
                self.scan_cap_reached = true;
                self.publish_finish_once();
            }
        }

        if self.alive_count >= self.max_alive_hosts {
            self.alive_cap_flag.set();
        }

        Ok(())
    }

    fn publish_finish_once(&self) {
        if !self.finish_published.swap(true, Ordering::AcqRel) {
            if let Err(e) = self.queue.publish_finish() {
                tracing::warn!(error = %e, "failed to publish finish signal at scan cap");
            }
        }
    }
}
