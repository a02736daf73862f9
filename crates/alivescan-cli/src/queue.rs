//! A stdout-backed [`OutputQueue`] for manual runs.
//!
//! Writes one line per publish: the bare address for alive hosts, a
//! `KEY|||body` line for keyed messages, and a `FINISH` sentinel. This is a
//! standalone consumer of the same format the engine publishes to any real
//! downstream queue; a real pipeline would replace this with whatever
//! message bus it already runs.

use alivescan_core::Result;
use alivescan_engine::OutputQueue;
use std::io::Write;

pub struct StdoutQueue {
    stdout: std::io::Stdout,
}

impl StdoutQueue {
    pub fn new() -> Self {
        Self {
            stdout: std::io::stdout(),
        }
    }
}

impl Default for StdoutQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputQueue for StdoutQueue {
    fn publish_host(&self, addr: &str) -> Result<()> {
        writeln!(self.stdout.lock(), "{addr}").ok();
        Ok(())
    }

    fn publish_finish(&self) -> Result<()> {
        writeln!(self.stdout.lock(), "FINISH").ok();
        Ok(())
    }

    fn publish_message(&self, key: &str, body: &str) -> Result<()> {
        writeln!(self.stdout.lock(), "{key}|||{body}").ok();
        Ok(())
    }
}
