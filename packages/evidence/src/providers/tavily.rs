//! Tavily-backed web searcher.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{EvidenceError, Result};
use crate::traits::searcher::{SearchHit, WebSearcher};

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Tavily search API client.
pub struct TavilyWebSearcher {
    api_key: SecretString,
    client: reqwest::Client,
    endpoint: String,
    /// Default number of results to return.
    pub default_limit: usize,
    /// "basic" or "advanced"; advanced returns longer page extracts.
    pub search_depth: String,
}

impl TavilyWebSearcher {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            api_key: api_key.into(),
            client,
            endpoint: TAVILY_SEARCH_URL.to_string(),
            default_limit: 8,
            search_depth: "advanced".to_string(),
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_search_depth(mut self, depth: impl Into<String>) -> Self {
        self.search_depth = depth.into();
        self
    }

    /// Point at a different endpoint (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    url: String,
    title: Option<String>,
    content: Option<String>,
    score: Option<f32>,
}

impl TavilyResult {
    fn into_hit(self) -> Option<SearchHit> {
        let mut hit = SearchHit::new(Url::parse(&self.url).ok()?);
        hit.title = self.title;
        hit.snippet = self.content;
        hit.score = self.score;
        Some(hit)
    }
}

#[async_trait]
impl WebSearcher for TavilyWebSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.search_with_limit(query, self.default_limit).await
    }

    async fn search_with_limit(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(EvidenceError::Config("TAVILY_API_KEY is empty".into()));
        }

        let request = TavilyRequest {
            query,
            search_depth: &self.search_depth,
            max_results: limit,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .json(&request)
            .send()
            .await
            .map_err(EvidenceError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(super::error_from_response(self.name(), response).await);
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| EvidenceError::Parse(e.to_string()))?;

        let hits: Vec<SearchHit> = body
            .results
            .into_iter()
            .filter_map(TavilyResult::into_hit)
            .collect();

        debug!(query, results = hits.len(), "Tavily search complete");
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_without_valid_url_is_skipped() {
        let raw: TavilyResponse = serde_json::from_value(serde_json::json!({
            "results": [
                {"url": "https://acme.example/about", "title": "About", "content": "Acme builds rockets", "score": 0.91},
                {"url": "not a url", "title": "Broken"}
            ]
        }))
        .unwrap();

        let hits: Vec<_> = raw.results.into_iter().filter_map(TavilyResult::into_hit).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text(), "Acme builds rockets");
        assert_eq!(hits[0].score, Some(0.91));
    }

    #[tokio::test]
    async fn test_empty_key_is_config_error() {
        let searcher = TavilyWebSearcher::new(String::new());
        let err = searcher.search("acme competitors").await.unwrap_err();
        assert!(matches!(err, EvidenceError::Config(_)));
    }
}
