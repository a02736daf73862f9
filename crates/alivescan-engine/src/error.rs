//! Engine-specific error types with recovery hints.
//!
//! These are richer than [`alivescan_core::Error`]: they categorize for
//! progress tracking and carry a retriability flag so the lifecycle
//! controller can decide whether to keep going. Every variant bridges into
//! the shared core error via `From` for anything that crosses a crate
//! boundary (the output queue, the management client).

use alivescan_core::SocketKind;
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Comprehensive engine error type with recovery hints.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// The resolved configuration was rejected before any socket was opened.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// One of the required raw sockets could not be opened; fatal for the run.
    #[error("failed to open {kind} socket: {reason}")]
    SocketInit { kind: SocketKind, reason: String },

    /// The capture handle could not be opened or the filter failed to install.
    #[error("failed to open capture handle: {0}")]
    CaptureInit(String),

    /// A single probe emission failed. Never fatal; logged and iteration continues.
    #[error("failed to send probe to {dst} via {kind}: {reason}")]
    SendFailed {
        dst: String,
        kind: SocketKind,
        reason: String,
    },

    /// Publishing to the downstream output queue failed.
    #[error("failed to publish to output queue: {0}")]
    QueueFailed(String),

    /// One or more resource releases reported an error during teardown.
    #[error("cleanup error: {0}")]
    Cleanup(String),
}

impl EngineError {
    /// Whether retrying the operation that produced this error makes sense.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::InvalidConfiguration(_) => false,
            Self::SocketInit { .. } => false,
            Self::CaptureInit(_) => false,
            Self::SendFailed { .. } => true,
            Self::QueueFailed(_) => true,
            Self::Cleanup(_) => false,
        }
    }

    /// Error category for progress tracking and statistics.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfiguration(_) => ErrorCategory::ConfigError,
            Self::SocketInit { .. } => ErrorCategory::SocketInit,
            Self::CaptureInit(_) => ErrorCategory::CaptureInit,
            Self::SendFailed { .. } => ErrorCategory::SendFailed,
            Self::QueueFailed(_) => ErrorCategory::QueueFailed,
            Self::Cleanup(_) => ErrorCategory::Cleanup,
        }
    }

    /// Whether this category is fatal to the run (aborts before probing starts).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::SocketInit { .. } | Self::CaptureInit(_)
        )
    }
}

/// Error category for progress tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    ConfigError,
    SocketInit,
    CaptureInit,
    SendFailed,
    QueueFailed,
    Cleanup,
}

impl ErrorCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConfigError => "Configuration Error",
            Self::SocketInit => "Socket Init Failed",
            Self::CaptureInit => "Capture Init Failed",
            Self::SendFailed => "Send Failed",
            Self::QueueFailed => "Queue Failed",
            Self::Cleanup => "Cleanup Error",
        }
    }
}

impl From<EngineError> for alivescan_core::Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidConfiguration(msg) => alivescan_core::Error::Config(msg),
            EngineError::SocketInit { kind, reason } => alivescan_core::Error::Socket { kind, reason },
            EngineError::CaptureInit(msg) => alivescan_core::Error::Capture(msg),
            EngineError::SendFailed { dst, kind, reason } => {
                alivescan_core::Error::Send { dst, kind, reason }
            }
            EngineError::QueueFailed(msg) => alivescan_core::Error::Queue(msg),
            EngineError::Cleanup(msg) => alivescan_core::Error::Cleanup(msg),
        }
    }
}

impl From<alivescan_core::Error> for EngineError {
    fn from(err: alivescan_core::Error) -> Self {
        match err {
            alivescan_core::Error::Config(msg) => EngineError::InvalidConfiguration(msg),
            alivescan_core::Error::Socket { kind, reason } => EngineError::SocketInit { kind, reason },
            alivescan_core::Error::Capture(msg) => EngineError::CaptureInit(msg),
            alivescan_core::Error::Send { dst, kind, reason } => {
                EngineError::SendFailed { dst, kind, reason }
            }
            alivescan_core::Error::Queue(msg) => EngineError::QueueFailed(msg),
            alivescan_core::Error::Cleanup(msg) => EngineError::Cleanup(msg),
            other => EngineError::Cleanup(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_init_is_fatal_and_not_retriable() {
        let err = EngineError::SocketInit {
            kind: SocketKind::IcmpV4,
            reason: "permission denied".to_string(),
        };
        assert!(err.is_fatal());
        assert!(!err.is_retriable());
        assert_eq!(err.category(), ErrorCategory::SocketInit);
    }

    #[test]
    fn send_failed_is_retriable_and_not_fatal() {
        let err = EngineError::SendFailed {
            dst: "10.0.0.1".to_string(),
            kind: SocketKind::TcpV4,
            reason: "network unreachable".to_string(),
        };
        assert!(err.is_retriable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn bridges_into_core_error_and_back() {
        let err = EngineError::QueueFailed("broken pipe".to_string());
        let core: alivescan_core::Error = err.into();
        assert!(matches!(core, alivescan_core::Error::Queue(_)));
        let back: EngineError = core.into();
        assert!(matches!(back, EngineError::QueueFailed(_)));
    }

    #[test]
    fn category_names_are_human_readable() {
        assert_eq!(ErrorCategory::SocketInit.name(), "Socket Init Failed");
        assert_eq!(ErrorCategory::QueueFailed.name(), "Queue Failed");
    }
}
