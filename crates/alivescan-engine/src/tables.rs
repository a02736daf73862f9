//! Target and alive-host tables, keyed by canonical address string.
//!
//! The target table is built once before the sniffer starts and is
//! read-only for the rest of the run, so it needs no interior mutability
//! beyond a shared reference. The alive table is exclusively owned and
//! mutated by the sniffer thread (see [`crate::sniffer`]).

use alivescan_core::{CanonicalAddr, ProbeAddr};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

/// A target address plus the caller-supplied opaque handle associated with
/// it. The engine only borrows the handle; ownership stays with the caller.
pub struct TargetTable<H> {
    entries: HashMap<CanonicalAddr, (ProbeAddr, H)>,
}

impl<H> TargetTable<H> {
    pub fn from_targets<I>(targets: I) -> Self
    where
        I: IntoIterator<Item = (IpAddr, H)>,
    {
        let entries = targets
            .into_iter()
            .map(|(addr, handle)| {
                let probe = ProbeAddr::from_ip(addr);
                (probe.canonical(), (probe, handle))
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_target(&self, addr: &CanonicalAddr) -> bool {
        self.entries.contains_key(addr)
    }

    pub fn for_each_target<F: FnMut(&CanonicalAddr, ProbeAddr, &H)>(&self, mut f: F) {
        for (addr, (probe, handle)) in &self.entries {
            f(addr, *probe, handle);
        }
    }
}

/// The alive-seen set plus the deferred-publish set. Exclusively owned by
/// the sniffer thread for the duration of the run.
#[derive(Default)]
pub struct AliveTable {
    alive_seen: HashSet<CanonicalAddr>,
    deferred: HashSet<CanonicalAddr>,
}

impl AliveTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `addr` as a reply source. Returns `true` the first time this
    /// address is seen in this run; entries are never removed.
    pub fn mark_alive(&mut self, addr: CanonicalAddr) -> bool {
        self.alive_seen.insert(addr)
    }

    /// Move `addr` into the deferred-publish set: counted but never
    /// forwarded, and excluded from the dead-host tally.
    pub fn defer(&mut self, addr: CanonicalAddr) {
        self.deferred.insert(addr);
    }

    pub fn alive_count(&self) -> usize {
        self.alive_seen.len()
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Dead-host count against a target table: targets never observed as a
    /// reply source at all. Deferred hosts replied but were capped out of
    /// publishing; they are alive, not dead, so they stay out of this count
    /// even though they were never forwarded downstream. `skipped` is the
    /// number of targets the alive cap stopped the sender from ever probing;
    /// those are unknown, not dead, so they are excluded too.
    pub fn dead_count<H>(&self, targets: &TargetTable<H>, skipped: usize) -> usize {
        targets
            .len()
            .saturating_sub(self.alive_seen.len())
            .saturating_sub(skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_alive_reports_was_new_once() {
        let mut table = AliveTable::new();
        let addr = CanonicalAddr::new("10.0.0.1".parse().unwrap());
        assert!(table.mark_alive(addr.clone()));
        assert!(!table.mark_alive(addr));
    }

    #[test]
    fn target_table_collapses_v4_mapped_keys() {
        let targets: Vec<(IpAddr, u32)> = vec![("::ffff:10.0.0.1".parse().unwrap(), 1)];
        let table = TargetTable::from_targets(targets);
        let key = CanonicalAddr::new("10.0.0.1".parse().unwrap());
        assert!(table.is_target(&key));
    }

    #[test]
    fn dead_count_excludes_deferred_entries() {
        let targets: Vec<(IpAddr, ())> = vec![
            ("10.0.0.1".parse().unwrap(), ()),
            ("10.0.0.2".parse().unwrap(), ()),
            ("10.0.0.3".parse().unwrap(), ()),
        ];
        let table = TargetTable::from_targets(targets);

        let mut alive = AliveTable::new();
        alive.mark_alive(CanonicalAddr::new("10.0.0.1".parse().unwrap()));
        alive.mark_alive(CanonicalAddr::new("10.0.0.3".parse().unwrap()));
        alive.defer(CanonicalAddr::new("10.0.0.3".parse().unwrap()));

        // 10.0.0.1 published, 10.0.0.3 alive-but-deferred, 10.0.0.2 never replied: one dead host
        assert_eq!(alive.dead_count(&table, 0), 1);
    }

    #[test]
    fn empty_target_set_has_zero_dead_count() {
        let targets: TargetTable<()> = TargetTable::from_targets(Vec::new());
        let alive = AliveTable::new();
        assert_eq!(alive.dead_count(&targets, 0), 0);
    }

    #[test]
    fn dead_count_excludes_unprobed_skipped_targets() {
        let targets: Vec<(IpAddr, ())> = vec![
            ("10.0.0.1".parse().unwrap(), ()),
            ("10.0.0.2".parse().unwrap(), ()),
        ];
        let table = TargetTable::from_targets(targets);

        let mut alive = AliveTable::new();
        alive.mark_alive(CanonicalAddr::new("10.0.0.1".parse().unwrap()));

        // 10.0.0.2 was never probed because the alive cap stopped the sender
        // first; it is unknown, not dead.
        assert_eq!(alive.dead_count(&table, 1), 0);
    }
}
