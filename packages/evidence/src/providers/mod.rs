//! Reference provider adapters.

pub mod openai;
pub mod tavily;

pub use openai::OpenAiCompleter;
pub use tavily::TavilyWebSearcher;

use std::time::Duration;

use reqwest::{header::RETRY_AFTER, Response, StatusCode};
use tracing::warn;

use crate::error::EvidenceError;

/// Map a non-success HTTP response onto the error taxonomy.
pub(crate) async fn error_from_response(provider: &str, response: Response) -> EvidenceError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    warn!(provider, status = %status, error = %body, "Provider API error");
    classify_status(provider, status, retry_after, body)
}

fn classify_status(
    provider: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    message: String,
) -> EvidenceError {
    match status.as_u16() {
        429 => EvidenceError::RateLimited {
            provider: provider.to_string(),
            retry_after,
        },
        // Tavily reports plan limits with 432/433
        402 | 432 | 433 => EvidenceError::QuotaExhausted {
            provider: provider.to_string(),
            message,
        },
        401 | 403 => EvidenceError::Config(format!("{} rejected credentials", provider)),
        code => EvidenceError::Provider {
            provider: provider.to_string(),
            status: code,
            message,
        },
    }
}
