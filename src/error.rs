//! Error taxonomy for telemetry ingestion.
//!
//! Every variant is recovered per cycle by the poller: the facet it belongs to
//! keeps its previous value and the error is only logged and recorded.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TelemetryError {
    /// Request rejected, connection failure, or non-success HTTP status.
    #[error("network failure for {url}: {message}")]
    Network { url: String, message: String },
    /// The fetch did not complete within the per-fetch bound.
    #[error("fetch of {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    /// Response body is not the expected JSON shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("mission parameter {0:?} not present in report")]
    MissingParameter(String),
    #[error("mission parameter {key:?} is not numeric: {value:?}")]
    NonNumericValue { key: String, value: String },
}

impl TelemetryError {
    pub fn network(url: &str, message: impl ToString) -> Self {
        Self::Network {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn malformed(message: impl ToString) -> Self {
        Self::MalformedPayload(message.to_string())
    }

    /// Network-class failures are the ones that drive backoff.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPayload(format!("invalid json: {err}"))
    }
}
