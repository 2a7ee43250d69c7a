use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::probes::error::{ErrorKind, ProbeError};

/// Outcome of one probe run against one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub target: String,
    pub protocol: String,
    pub success: bool,
    pub kind: Option<ErrorKind>,
    pub message: Option<String>,
    pub duration_ms: u64,
    pub checked_at: DateTime<Utc>,
}

impl ProbeReport {
    pub fn new(
        target: &str,
        protocol: &str,
        outcome: &Result<(), ProbeError>,
        elapsed: Duration,
        checked_at: DateTime<Utc>,
    ) -> Self {
        let (kind, message) = match outcome {
            Ok(()) => (None, None),
            Err(e) => (Some(e.kind()), Some(e.to_string())),
        };

        Self {
            target: target.to_string(),
            protocol: protocol.to_string(),
            success: outcome.is_ok(),
            kind,
            message,
            duration_ms: elapsed.as_millis() as u64,
            checked_at,
        }
    }
}

impl std::fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => write!(
                f,
                "{} {}: failed ({}) {}",
                self.protocol, self.target, kind, message
            ),
            _ => write!(f, "{} {}: ok", self.protocol, self.target),
        }
    }
}
