//! The downstream output queue interface and an in-memory test double.
//!
//! The real queue lives outside this crate entirely (§6 of the design:
//! an opaque append-only string queue owned by the surrounding pipeline).
//! `alivescan-cli` supplies a stdout-backed implementation for manual runs;
//! this module only defines the trait and a recording double for tests.

use alivescan_core::Result;

/// Write-only interface to the downstream alive-host queue. Implementations
/// must be safe for concurrent publishers, though in practice the engine
/// only ever publishes from the sniffer thread and, once, from the
/// lifecycle controller.
pub trait OutputQueue: Send + Sync {
    /// Enqueue an alive address.
    fn publish_host(&self, addr: &str) -> Result<()>;

    /// Enqueue the finish sentinel. Must be safe to call more than once;
    /// the lifecycle controller guarantees only one logical call reaches
    /// here, but implementations should not assume it.
    fn publish_finish(&self) -> Result<()>;

    /// Enqueue a free-form diagnostic under a keyed sink, e.g. the
    /// `DEADHOST` count or the `ERRMSG` cap-reached notice.
    fn publish_message(&self, key: &str, body: &str) -> Result<()>;
}

/// An in-memory [`OutputQueue`] that records every call in order, for tests
/// and for `alivescan-cli`'s `--record` mode.
#[derive(Default)]
pub struct RecordingQueue {
    lines: parking_lot::Mutex<Vec<String>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line published so far, in publish order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn finish_count(&self) -> usize {
        self.lines.lock().iter().filter(|l| l.as_str() == "FINISH").count()
    }
}

impl OutputQueue for RecordingQueue {
    fn publish_host(&self, addr: &str) -> Result<()> {
        self.lines.lock().push(addr.to_string());
        Ok(())
    }

    fn publish_finish(&self) -> Result<()> {
        self.lines.lock().push("FINISH".to_string());
        Ok(())
    }

    fn publish_message(&self, key: &str, body: &str) -> Result<()> {
        self.lines.lock().push(format!("{key}|||{body}"));
        Ok(())
    }
}

/// The `DEADHOST` message body, for `publish_message("DEADHOST", ...)`. The
/// key is supplied separately by the caller; this is everything after it.
pub fn deadhost_message(count: usize) -> String {
    format!(" ||| ||| |||{count}")
}

/// The `ERRMSG` cap-reached notice body, for `publish_message("ERRMSG", ...)`.
pub fn cap_reached_message(remaining: usize) -> String {
    format!(
        " ||| ||| |||Maximum allowed number of alive hosts identified. \
         There are still {remaining} hosts whose alive status will not be checked."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_queue_preserves_publish_order() {
        let queue = RecordingQueue::new();
        queue.publish_host("10.0.0.1").unwrap();
        queue.publish_message("DEADHOST", " ||| ||| |||1").unwrap();
        queue.publish_finish().unwrap();

        assert_eq!(
            queue.lines(),
            vec![
                "10.0.0.1".to_string(),
                "DEADHOST||| ||| ||| |||1".to_string(),
                "FINISH".to_string(),
            ]
        );
    }

    #[test]
    fn deadhost_message_combines_with_the_key_into_the_documented_shape() {
        let queue = RecordingQueue::new();
        queue.publish_message("DEADHOST", &deadhost_message(3)).unwrap();
        assert_eq!(queue.lines(), vec!["DEADHOST||| ||| ||| |||3".to_string()]);
    }

    #[test]
    fn cap_reached_message_names_the_remaining_count() {
        let queue = RecordingQueue::new();
        queue.publish_message("ERRMSG", &cap_reached_message(7)).unwrap();
        let lines = queue.lines();
        assert!(lines[0].starts_with("ERRMSG|||"));
        assert!(lines[0].contains("7 hosts"));
    }
}
