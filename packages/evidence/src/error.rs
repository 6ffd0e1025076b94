//! Typed errors for the evidence gateway.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell
//! retryable provider hiccups apart from permanent failures.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by providers and by the gateway itself.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// Connection failed before a response arrived
    #[error("network error: {0}")]
    Network(String),

    /// Provider did not answer in time
    #[error("request timed out")]
    Timeout,

    /// Provider asked us to slow down (HTTP 429)
    #[error("rate limited by {provider}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    /// Provider plan or quota is used up
    #[error("{provider} quota exhausted: {message}")]
    QuotaExhausted { provider: String, message: String },

    /// Non-success HTTP status not covered above
    #[error("{provider} returned HTTP {status}: {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    /// Response body could not be understood
    #[error("failed to parse provider response: {0}")]
    Parse(String),

    /// Missing or invalid credentials/configuration
    #[error("config error: {0}")]
    Config(String),

    /// Capability is cooling down after quota exhaustion
    #[error("{capability} capacity exhausted")]
    CapacityExhausted { capability: &'static str },

    /// Caller cancelled while the call was queued or backing off
    #[error("operation cancelled")]
    Cancelled,
}

impl EvidenceError {
    /// Whether a retry of the same request may succeed.
    ///
    /// Network failures, timeouts, 429s and 5xx responses are transient.
    /// Everything else is permanent for the request that produced it.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout | Self::RateLimited { .. } => true,
            Self::Provider { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this error should put the capability into cool-down.
    ///
    /// Only a used-up plan does. A 429 that outlives its retries is still a
    /// transient failure of that one request.
    pub fn exhausts_capacity(&self) -> bool {
        matches!(self, Self::QuotaExhausted { .. })
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, EvidenceError>;
