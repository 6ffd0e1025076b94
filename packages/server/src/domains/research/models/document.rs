//! Documents gathered from search, tagged by research category.

use std::fmt;

use evidence::SearchHit;
use serde::{Deserialize, Serialize};

/// Relevance assumed when a provider does not score its results.
const UNSCORED_RELEVANCE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchCategory {
    Company,
    Industry,
    SectorTrends,
    ClientTrends,
    Financial,
    News,
    Competitor,
}

impl ResearchCategory {
    pub const ALL: [ResearchCategory; 7] = [
        Self::Company,
        Self::Industry,
        Self::SectorTrends,
        Self::ClientTrends,
        Self::Financial,
        Self::News,
        Self::Competitor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Industry => "industry",
            Self::SectorTrends => "sector_trends",
            Self::ClientTrends => "client_trends",
            Self::Financial => "financial",
            Self::News => "news",
            Self::Competitor => "competitor",
        }
    }

    /// Section heading used in reports.
    pub fn title(self) -> &'static str {
        match self {
            Self::Company => "Company Overview",
            Self::Industry => "Industry Landscape",
            Self::SectorTrends => "Sector Trends",
            Self::ClientTrends => "Client Industry Trends",
            Self::Financial => "Financial Position",
            Self::News => "Recent News",
            Self::Competitor => "Competitive Landscape",
        }
    }
}

impl fmt::Display for ResearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: Option<String>,
    pub content: String,
    pub relevance: f32,
    pub category: ResearchCategory,
}

impl Document {
    pub fn new(
        url: impl Into<String>,
        content: impl Into<String>,
        relevance: f32,
        category: ResearchCategory,
    ) -> Self {
        Self {
            url: url.into(),
            title: None,
            content: content.into(),
            relevance,
            category,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn from_hit(hit: SearchHit, category: ResearchCategory) -> Self {
        Self {
            content: hit.text().to_string(),
            relevance: hit.score.unwrap_or(UNSCORED_RELEVANCE).clamp(0.0, 1.0),
            url: hit.url.to_string(),
            title: hit.title,
            category,
        }
    }

    /// Title if present, otherwise the url.
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}
