//! Error types shared across the alivescan workspace.

use crate::types::SocketKind;
use std::io;
use std::net::AddrParseError;
use thiserror::Error;

/// Result type alias for alivescan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type. Fatal variants (`Config`, `Socket`, `Capture`) abort
/// a run; `Send` and `Queue` are logged and the run continues.
#[derive(Error, Debug)]
pub enum Error {
    /// Permission/capability errors (raw sockets require elevated privilege).
    #[error("Insufficient privileges: {0}")]
    Privilege(String),

    /// I/O errors with automatic conversion.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Parsing errors for IP addresses, CIDR, ports.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration is invalid: empty method set, nonsensical caps, or an
    /// invalid port range that could not even fall back to the default.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required raw socket could not be opened; fatal for the run.
    #[error("Failed to open {kind} socket: {reason}")]
    Socket { kind: SocketKind, reason: String },

    /// The capture handle could not be opened, or the BPF filter failed to
    /// compile or install; fatal.
    #[error("Capture error: {0}")]
    Capture(String),

    /// A single probe emission failed. Never fatal; logged and the
    /// orchestrator continues with the next target.
    #[error("Failed to send probe to {dst} via {kind}: {reason}")]
    Send {
        dst: String,
        kind: SocketKind,
        reason: String,
    },

    /// Publishing to the downstream output queue failed. Logged; the run
    /// continues, but downstream accounting may now be incomplete.
    #[error("Failed to publish to output queue: {0}")]
    Queue(String),

    /// One or more resource releases reported an error during teardown.
    /// Aggregated into a single outcome, never fatal on its own.
    #[error("Cleanup error: {0}")]
    Cleanup(String),
}

impl From<AddrParseError> for Error {
    fn from(err: AddrParseError) -> Self {
        Error::Parse(format!("invalid IP address: {err}"))
    }
}

impl From<ipnetwork::IpNetworkError> for Error {
    fn from(err: ipnetwork::IpNetworkError) -> Self {
        Error::Parse(format!("Invalid IP network: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(format!("TOML serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn socket_error_names_the_kind() {
        let err = Error::Socket {
            kind: SocketKind::ArpV4,
            reason: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("arpv4"));
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn addr_parse_error_conversion() {
        let parse_err = "invalid".parse::<std::net::IpAddr>().unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("invalid IP address"));
    }

    #[test]
    fn ip_network_error_conversion() {
        use ipnetwork::IpNetwork;
        let network_err = "999.0.0.0/24".parse::<IpNetwork>().unwrap_err();
        let err: Error = network_err.into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("invalid IP network"));
    }

    #[test]
    fn json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<i32>>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn error_result_type() {
        fn returns_result() -> Result<i32> {
            Err(Error::Timeout)
        }

        let result = returns_result();
        assert!(result.is_err());
        assert!(matches!(result, Err(Error::Timeout)));
    }
}
