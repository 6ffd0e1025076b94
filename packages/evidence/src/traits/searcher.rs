//! Web search capability.
//!
//! Abstracts over search providers (Tavily, SerpAPI, ...). The research
//! engine only ever sees `SearchHit`s; which provider produced them is a
//! wiring decision made at startup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// A single web search result with whatever metadata the provider returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: Url,

    pub title: Option<String>,

    /// Extracted page text or snippet.
    pub snippet: Option<String>,

    /// Provider relevance score (0.0-1.0, if provided).
    pub score: Option<f32>,
}

impl SearchHit {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            title: None,
            snippet: None,
            score: None,
        }
    }

    /// Create from a URL string. Returns `None` for unparseable URLs.
    pub fn from_url(url: &str) -> Option<Self> {
        Url::parse(url).ok().map(Self::new)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Text content, falling back to the title when no snippet exists.
    pub fn text(&self) -> &str {
        self.snippet
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or_default()
    }
}

/// Web search trait.
///
/// # Implementations
///
/// - `TavilyWebSearcher` - Tavily API
/// - `testing::MockWebSearcher` - scripted results and failures
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Search the web for pages relevant to the query.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Search with a specific result limit.
    async fn search_with_limit(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let mut results = self.search(query).await?;
        results.truncate(limit);
        Ok(results)
    }

    /// Provider name used in logs and errors.
    fn name(&self) -> &'static str {
        "search"
    }
}
