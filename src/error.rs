//! Transport error types.
//!
//! Every failure of an Ollama call (connection, timeout, bad status, bad body)
//! is normalized into [`TransportError`] at the client boundary. The display
//! text is what ends up in the transcript, so it is written for the user.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, DNS failure, reset, or any other I/O fault.
    #[error("Connection error: {reason}")]
    Network { reason: String },

    /// No response within the per-call bound.
    #[error("Connection error: request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-2xx HTTP response.
    #[error("Error: {status} - {body}")]
    Protocol { status: u16, body: String },

    /// 2xx response whose body is missing the expected fields.
    #[error("Error: unexpected response from server: {reason}")]
    Schema { reason: String },

    /// The worker running the call died before producing a result.
    #[error("Error: {reason}")]
    Internal { reason: String },
}

impl TransportError {
    /// Classify a reqwest failure. `secs` is the bound that was in force.
    pub fn from_reqwest(err: reqwest::Error, secs: u64) -> Self {
        if err.is_timeout() {
            TransportError::Timeout { secs }
        } else if err.is_decode() {
            TransportError::Schema {
                reason: err.to_string(),
            }
        } else {
            TransportError::Network {
                reason: err.to_string(),
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Schema {
            reason: err.to_string(),
        }
    }
}
