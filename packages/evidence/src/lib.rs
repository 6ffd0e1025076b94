//! Evidence gateway: rate-limited access to web search and text completion.
//!
//! The research engine never talks to providers directly. It holds one
//! [`EvidenceGateway`] that owns the per-capability limits (a concurrency
//! semaphore plus a token bucket), retries transient failures with
//! exponential backoff, and tracks provider quota exhaustion.
//!
//! # Capabilities
//!
//! - [`WebSearcher`]: `search(query) -> Vec<SearchHit>`
//! - [`Completer`]: `complete(prompt) -> String`
//!
//! # Example
//!
//! ```rust,ignore
//! use evidence::{EvidenceGateway, OpenAiCompleter, TavilyWebSearcher};
//!
//! let gateway = EvidenceGateway::new(
//!     Arc::new(TavilyWebSearcher::new(tavily_key)),
//!     Arc::new(OpenAiCompleter::new(openai_key, "gpt-4o-mini")),
//! );
//! let hits = gateway.search("acme competitors", 8, &cancel).await?;
//! ```

pub mod error;
pub mod gateway;
pub mod providers;
pub mod retry;
pub mod testing;
pub mod traits;

pub use error::{EvidenceError, Result};
pub use gateway::{
    CapabilityLimits, EvidenceGateway, EvidenceGatewayBuilder, GatewayStatus, LaneStatus,
};
pub use providers::{OpenAiCompleter, TavilyWebSearcher};
pub use retry::RetryPolicy;
pub use secrecy::{ExposeSecret, SecretString};
pub use traits::{Completer, SearchHit, WebSearcher};

pub use tokio_util::sync::CancellationToken;
