//! Error types for probe configuration and execution

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// The point in a run at which the deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Connect,
    TlsHandshake,
    Read,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Connect => write!(f, "connect"),
            Stage::TlsHandshake => write!(f, "tls handshake"),
            Stage::Read => write!(f, "read"),
        }
    }
}

/// Everything that can make a probe report an unhealthy target.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// A recognized option carried a value the probe cannot use
    #[error("invalid value {value:?} for option '{option}': {reason}")]
    Config {
        option: String,
        value: String,
        reason: String,
    },

    /// The probe needs an option the instruction line did not supply
    #[error("missing required option '{0}'")]
    MissingOption(String),

    #[error("connection to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("reading from {address} failed: {source}")]
    Read {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} with {address} timed out after {after:?}")]
    Timeout {
        stage: Stage,
        address: String,
        after: Duration,
    },

    #[error("tls negotiation with {address} failed: {reason}")]
    Tls { address: String, reason: String },

    /// The service answered, but not the way the protocol should
    #[error("{0}")]
    Validation(String),

    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),
}

/// Flat classification of a [`ProbeError`], for alerting and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Configuration,
    Connection,
    Timeout,
    Tls,
    Validation,
    UnknownProtocol,
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Config { .. } | ProbeError::MissingOption(_) => ErrorKind::Configuration,
            ProbeError::Connect { .. } | ProbeError::Read { .. } => ErrorKind::Connection,
            ProbeError::Timeout { .. } => ErrorKind::Timeout,
            ProbeError::Tls { .. } => ErrorKind::Tls,
            ProbeError::Validation(_) => ErrorKind::Validation,
            ProbeError::UnknownProtocol(_) => ErrorKind::UnknownProtocol,
        }
    }

    pub(crate) fn config(option: &str, value: &str, reason: impl Into<String>) -> Self {
        ProbeError::Config {
            option: option.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Connection => write!(f, "connection"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Tls => write!(f, "tls"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::UnknownProtocol => write!(f, "unknown-protocol"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = ProbeError::config("port", "abc", "not a number");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            ProbeError::MissingOption("port".to_string()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ProbeError::UnknownProtocol("gopher".to_string()).kind(),
            ErrorKind::UnknownProtocol
        );
        let timeout = ProbeError::Timeout {
            stage: Stage::Read,
            address: "127.0.0.1:25".to_string(),
            after: Duration::from_millis(100),
        };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_error_messages() {
        let err = ProbeError::config("port", "abc", "expected an unsigned integer");
        assert_eq!(
            err.to_string(),
            "invalid value \"abc\" for option 'port': expected an unsigned integer"
        );

        let timeout = ProbeError::Timeout {
            stage: Stage::TlsHandshake,
            address: "[::1]:993".to_string(),
            after: Duration::from_secs(2),
        };
        assert_eq!(timeout.to_string(), "tls handshake with [::1]:993 timed out after 2s");
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::UnknownProtocol).unwrap();
        assert_eq!(json, "\"unknown-protocol\"");
        assert_eq!(format!("{}", ErrorKind::Tls), "tls");
    }
}
