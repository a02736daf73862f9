//! CLI-specific error types with user-friendly messages and Unix exit codes.

use thiserror::Error;

/// CLI-specific error types.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("invalid target '{spec}': {reason}")]
    InvalidTarget { spec: String, reason: String },

    #[error("no targets specified")]
    NoTargets,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("engine error: {0}")]
    Engine(#[from] alivescan_engine::EngineError),
}

impl CliError {
    /// Returns the exit code for this error (Unix-compatible).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidTarget { .. } => exit_codes::INVALID_ARGS,
            Self::NoTargets => exit_codes::INVALID_ARGS,
            Self::Config(_) => exit_codes::CONFIG_ERROR,
            Self::Engine(_) => exit_codes::SCAN_FAILED,
        }
    }
}

/// Exit codes for CLI (Unix-compatible).
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_ARGS: i32 = 2;
    pub const CONFIG_ERROR: i32 = 6;
    pub const SCAN_FAILED: i32 = 5;
    pub const CANCELLED: i32 = 130;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_targets_maps_to_invalid_args() {
        assert_eq!(CliError::NoTargets.exit_code(), exit_codes::INVALID_ARGS);
    }

    #[test]
    fn config_error_maps_to_config_exit_code() {
        let err = CliError::Config("bad toml".to_string());
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }
}
