//! Testing utilities including mock implementations.
//!
//! These let applications exercise the gateway without network calls:
//! results and completions are scripted, failures can be injected per
//! query pattern, and every call is recorded for assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{EvidenceError, Result};
use crate::traits::{Completer, SearchHit, WebSearcher};

/// Kind of failure a mock should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Network-style failure, retried by the gateway.
    Transient,
    /// HTTP 400, never retried.
    Permanent,
    /// HTTP 429, retried like any transient failure.
    RateLimited,
    /// Plan limit hit, puts the capability into cool-down.
    QuotaExhausted,
}

impl MockFailure {
    fn to_error(self, provider: &str) -> EvidenceError {
        match self {
            Self::Transient => EvidenceError::Network("connection reset by mock".into()),
            Self::Permanent => EvidenceError::Provider {
                provider: provider.to_string(),
                status: 400,
                message: "mock bad request".into(),
            },
            Self::RateLimited => EvidenceError::RateLimited {
                provider: provider.to_string(),
                retry_after: None,
            },
            Self::QuotaExhausted => EvidenceError::QuotaExhausted {
                provider: provider.to_string(),
                message: "mock plan limit".into(),
            },
        }
    }
}

struct FailureRule {
    pattern: String,
    /// `None` fails forever.
    remaining: Option<u32>,
    kind: MockFailure,
}

/// Returns the failure to inject for `input`, consuming one scripted failure.
fn take_failure(rules: &RwLock<Vec<FailureRule>>, input: &str) -> Option<MockFailure> {
    let mut rules = rules.write().unwrap_or_else(PoisonError::into_inner);
    let rule = rules
        .iter_mut()
        .find(|r| input.contains(&r.pattern) && r.remaining != Some(0))?;
    if let Some(remaining) = rule.remaining.as_mut() {
        *remaining -= 1;
    }
    Some(rule.kind)
}

struct InFlight<'a> {
    current: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(current: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { current }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

type SearchResponder = Box<dyn Fn(&str) -> Vec<SearchHit> + Send + Sync>;
type CompletionResponder = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Mock web searcher.
///
/// Lookup order: exact query results, then the responder, then nothing.
#[derive(Default)]
pub struct MockWebSearcher {
    results: RwLock<HashMap<String, Vec<SearchHit>>>,
    responder: Option<SearchResponder>,
    failures: RwLock<Vec<FailureRule>>,
    latency: Option<Duration>,
    calls: RwLock<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockWebSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add results for an exact query.
    pub fn with_results(self, query: &str, results: Vec<SearchHit>) -> Self {
        self.results
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(query.to_string(), results);
        self
    }

    /// Add URL strings as results for an exact query.
    pub fn with_urls(self, query: &str, urls: &[&str]) -> Self {
        let results = urls.iter().filter_map(|u| SearchHit::from_url(u)).collect();
        self.with_results(query, results)
    }

    /// Compute results for queries without an exact entry.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&str) -> Vec<SearchHit> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Fail every query containing `pattern`.
    pub fn failing(self, pattern: &str, kind: MockFailure) -> Self {
        self.push_failure(pattern, None, kind)
    }

    /// Fail the first `times` queries containing `pattern`.
    pub fn failing_times(self, pattern: &str, times: u32, kind: MockFailure) -> Self {
        self.push_failure(pattern, Some(times), kind)
    }

    /// Sleep this long inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn push_failure(self, pattern: &str, remaining: Option<u32>, kind: MockFailure) -> Self {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FailureRule {
                pattern: pattern.to_string(),
                remaining,
                kind,
            });
        self
    }

    /// Every query received, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count_matching(&self, pattern: &str) -> usize {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|q| q.contains(pattern))
            .count()
    }

    /// Highest number of calls observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());
        let _guard = InFlight::enter(&self.in_flight, &self.peak_in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(kind) = take_failure(&self.failures, query) {
            return Err(kind.to_error(self.name()));
        }

        let exact = self
            .results
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(query)
            .cloned();

        Ok(exact
            .or_else(|| self.responder.as_ref().map(|r| r(query)))
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "mock-search"
    }
}

/// Mock completer.
///
/// Rules are `(pattern, response)` pairs checked in insertion order against
/// the prompt; the first rule whose pattern occurs in the prompt wins.
#[derive(Default)]
pub struct MockCompleter {
    rules: RwLock<Vec<(String, String)>>,
    responder: Option<CompletionResponder>,
    default_response: String,
    failures: RwLock<Vec<FailureRule>>,
    latency: Option<Duration>,
    prompts: RwLock<Vec<String>>,
}

impl MockCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `response` to prompts containing `pattern`.
    pub fn with_response(self, pattern: &str, response: impl Into<String>) -> Self {
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pattern.to_string(), response.into()));
        self
    }

    /// Compute responses for prompts no rule matched.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Response used when nothing else matches (empty by default).
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    pub fn failing(self, pattern: &str, kind: MockFailure) -> Self {
        self.push_failure(pattern, None, kind)
    }

    pub fn failing_times(self, pattern: &str, times: u32, kind: MockFailure) -> Self {
        self.push_failure(pattern, Some(times), kind)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn push_failure(self, pattern: &str, remaining: Option<u32>, kind: MockFailure) -> Self {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FailureRule {
                pattern: pattern.to_string(),
                remaining,
                kind,
            });
        self
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn prompt_count_matching(&self, pattern: &str) -> usize {
        self.prompts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| p.contains(pattern))
            .count()
    }
}

#[async_trait]
impl Completer for MockCompleter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(kind) = take_failure(&self.failures, prompt) {
            return Err(kind.to_error(self.name()));
        }

        let matched = self
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        Ok(matched
            .or_else(|| self.responder.as_ref().and_then(|r| r(prompt)))
            .unwrap_or_else(|| self.default_response.clone()))
    }

    fn name(&self) -> &'static str {
        "mock-completion"
    }
}
