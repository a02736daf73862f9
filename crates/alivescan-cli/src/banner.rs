//! Startup banner for the alivescan CLI.

use colored::Colorize;

/// Banner display for alivescan.
pub struct Banner {
    version: String,
}

impl Banner {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
        }
    }

    /// Print a single-line banner: "⟨alivescan⟩ v0.1.0 ─ host-liveness probe".
    pub fn print(&self) {
        println!(
            "{} {} {} {}",
            "⟨alivescan⟩".bright_cyan().bold(),
            self.version.bright_green(),
            "─".bright_black(),
            "host-liveness probe".bright_white()
        );
    }
}

impl Default for Banner {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_stores_version() {
        let banner = Banner::new("1.2.3");
        assert_eq!(banner.version, "1.2.3");
    }

    #[test]
    fn default_banner_uses_crate_version() {
        let banner = Banner::default();
        assert!(!banner.version.is_empty());
    }
}
