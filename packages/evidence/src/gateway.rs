//! The evidence gateway: one rate-limited front door for search and completion.
//!
//! Every outbound provider call goes through a per-capability lane that holds
//! a concurrency semaphore and a token bucket. Both are owned by the gateway
//! instance, so every job sharing the same `Arc<EvidenceGateway>` shares the
//! same limits.
//!
//! # Usage
//!
//! ```rust,ignore
//! let gateway = EvidenceGateway::builder(searcher, completer)
//!     .search_limits(CapabilityLimits::new(5, 5))
//!     .retry(RetryPolicy::new(2, Duration::from_millis(500)))
//!     .build();
//!
//! let hits = gateway.search("acme competitors", 8, &cancel).await?;
//! let text = gateway.complete("Summarize ...", &cancel).await?;
//! ```

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::Serialize;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{EvidenceError, Result};
use crate::retry::RetryPolicy;
use crate::traits::{Completer, SearchHit, WebSearcher};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Concurrency and rate limits for one capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityLimits {
    pub max_concurrency: usize,
    pub requests_per_second: u32,
    pub burst: u32,
}

impl CapabilityLimits {
    pub fn new(max_concurrency: usize, requests_per_second: u32) -> Self {
        Self {
            max_concurrency,
            requests_per_second,
            burst: requests_per_second,
        }
    }

    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }
}

impl Default for CapabilityLimits {
    fn default() -> Self {
        Self::new(5, 5)
    }
}

/// Snapshot of one lane, reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LaneStatus {
    pub capability: &'static str,
    pub max_concurrency: usize,
    pub available_permits: usize,
    pub exhausted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub search: LaneStatus,
    pub completion: LaneStatus,
}

struct Lane {
    capability: &'static str,
    permits: Semaphore,
    max_concurrency: usize,
    limiter: DefaultRateLimiter,
    exhausted_until: Mutex<Option<Instant>>,
}

impl Lane {
    fn new(capability: &'static str, limits: &CapabilityLimits) -> Self {
        let max_concurrency = limits.max_concurrency.max(1);
        let rate = NonZeroU32::new(limits.requests_per_second).unwrap_or(nonzero!(1u32));
        let burst = NonZeroU32::new(limits.burst).unwrap_or(rate);

        Self {
            capability,
            permits: Semaphore::new(max_concurrency),
            max_concurrency,
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
            exhausted_until: Mutex::new(None),
        }
    }

    /// Wait for a concurrency permit, then for a token.
    async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EvidenceError::Cancelled)?;
        self.limiter.until_ready().await;
        Ok(permit)
    }

    fn is_exhausted(&self) -> bool {
        let mut guard = self
            .exhausted_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *guard {
            Some(until) if until > Instant::now() => true,
            Some(_) => {
                *guard = None;
                false
            }
            None => false,
        }
    }

    fn mark_exhausted(&self, cooldown: Duration) {
        let until = Instant::now() + cooldown;
        let mut guard = self
            .exhausted_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(guard.map_or(until, |current| current.max(until)));
    }

    fn status(&self) -> LaneStatus {
        LaneStatus {
            capability: self.capability,
            max_concurrency: self.max_concurrency,
            available_permits: self.permits.available_permits(),
            exhausted: self.is_exhausted(),
        }
    }
}

/// Rate-limited, retrying facade over a searcher and a completer.
pub struct EvidenceGateway {
    searcher: Arc<dyn WebSearcher>,
    completer: Arc<dyn Completer>,
    search_lane: Lane,
    completion_lane: Lane,
    retry: RetryPolicy,
    exhaustion_cooldown: Duration,
}

impl EvidenceGateway {
    pub fn new(searcher: Arc<dyn WebSearcher>, completer: Arc<dyn Completer>) -> Self {
        Self::builder(searcher, completer).build()
    }

    pub fn builder(
        searcher: Arc<dyn WebSearcher>,
        completer: Arc<dyn Completer>,
    ) -> EvidenceGatewayBuilder {
        EvidenceGatewayBuilder {
            searcher,
            completer,
            search: CapabilityLimits::default(),
            completion: CapabilityLimits::new(4, 3),
            retry: RetryPolicy::default(),
            exhaustion_cooldown: Duration::from_secs(60),
        }
    }

    /// Run a web search through the search lane.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>> {
        let searcher = &self.searcher;
        self.dispatch(&self.search_lane, cancel, move || {
            searcher.search_with_limit(query, max_results)
        })
        .await
    }

    /// Run a text completion through the completion lane.
    pub async fn complete(&self, prompt: &str, cancel: &CancellationToken) -> Result<String> {
        let completer = &self.completer;
        self.dispatch(&self.completion_lane, cancel, move || {
            completer.complete(prompt)
        })
        .await
    }

    /// True while any capability is cooling down after quota exhaustion.
    pub fn is_exhausted(&self) -> bool {
        self.search_lane.is_exhausted() || self.completion_lane.is_exhausted()
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            search: self.search_lane.status(),
            completion: self.completion_lane.status(),
        }
    }

    /// Attempt `op` under the lane's limits, retrying transient failures.
    ///
    /// Cancellation is honoured while waiting for a permit or sleeping
    /// between attempts. A call already sent to the provider runs to
    /// completion; the caller decides whether to use its result.
    async fn dispatch<T, F, Fut>(&self, lane: &Lane, cancel: &CancellationToken, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(EvidenceError::Cancelled);
            }
            if lane.is_exhausted() {
                return Err(EvidenceError::CapacityExhausted {
                    capability: lane.capability,
                });
            }

            let permit = tokio::select! {
                _ = cancel.cancelled() => return Err(EvidenceError::Cancelled),
                permit = lane.acquire() => permit?,
            };
            let outcome = op().await;
            drop(permit);

            let error = match outcome {
                Ok(value) => {
                    debug!(capability = lane.capability, attempt, "Provider call succeeded");
                    return Ok(value);
                }
                Err(error) => error,
            };

            if self.retry.should_retry(attempt, &error) {
                let delay = self.retry.delay_for(attempt, &error);
                warn!(
                    capability = lane.capability,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient provider error, retrying"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(EvidenceError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
                continue;
            }

            if error.exhausts_capacity() {
                warn!(
                    capability = lane.capability,
                    cooldown_secs = self.exhaustion_cooldown.as_secs(),
                    "Provider capacity exhausted"
                );
                lane.mark_exhausted(self.exhaustion_cooldown);
            }
            return Err(error);
        }
    }
}

/// Builder for [`EvidenceGateway`].
pub struct EvidenceGatewayBuilder {
    searcher: Arc<dyn WebSearcher>,
    completer: Arc<dyn Completer>,
    search: CapabilityLimits,
    completion: CapabilityLimits,
    retry: RetryPolicy,
    exhaustion_cooldown: Duration,
}

impl EvidenceGatewayBuilder {
    pub fn search_limits(mut self, limits: CapabilityLimits) -> Self {
        self.search = limits;
        self
    }

    pub fn completion_limits(mut self, limits: CapabilityLimits) -> Self {
        self.completion = limits;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn exhaustion_cooldown(mut self, cooldown: Duration) -> Self {
        self.exhaustion_cooldown = cooldown;
        self
    }

    pub fn build(self) -> EvidenceGateway {
        EvidenceGateway {
            search_lane: Lane::new("search", &self.search),
            completion_lane: Lane::new("completion", &self.completion),
            searcher: self.searcher,
            completer: self.completer,
            retry: self.retry,
            exhaustion_cooldown: self.exhaustion_cooldown,
        }
    }
}
