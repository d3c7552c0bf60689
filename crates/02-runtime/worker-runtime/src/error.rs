use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Value;

/// Failure raised by a remote function, as carried across the shared channel.
///
/// On the wire this is UTF-8 JSON: `{"message": "...", "trace": "..."}`.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct RemoteError {
    /// Human readable failure description.
    pub message: String,
    /// Optional backtrace or stack text captured where the failure happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl RemoteError {
    /// Error without a trace.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
        }
    }

    /// Attaches a trace.
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// The error reported when an entry point returns something other than bytes.
    pub fn contract_violation(value: &Value) -> Self {
        Self::new(format!(
            "result must be a byte buffer, got: {}",
            value.type_name()
        ))
    }

    /// Serialises the error for transfer.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| self.message.clone().into_bytes())
    }

    /// Reconstructs an error from transferred bytes.
    ///
    /// Payloads that are not a serialised error still surface, using their
    /// (lossy) text as the message.
    pub fn decode(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Self::new(String::from_utf8_lossy(bytes).into_owned()))
    }
}
