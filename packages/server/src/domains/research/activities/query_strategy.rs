//! Per-round discovery query strategies.
//!
//! The strategy is fixed by round number: broad first, then review
//! platforms and communities, then niche and specialized players.

use serde::{Deserialize, Serialize};

use crate::domains::research::models::CompanyProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStrategy {
    Broad,
    PlatformCommunity,
    Niche,
}

impl QueryStrategy {
    pub const MIN_QUERIES: usize = 3;
    pub const MAX_QUERIES: usize = 5;

    /// Strategy for a 1-based round; rounds past 3 stay niche.
    pub fn for_round(round: u32) -> Self {
        match round {
            0 | 1 => Self::Broad,
            2 => Self::PlatformCommunity,
            _ => Self::Niche,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Broad => "broad",
            Self::PlatformCommunity => "platform/community",
            Self::Niche => "niche",
        }
    }

    /// Between 3 and 5 distinct queries for `profile`.
    pub fn queries(self, profile: &CompanyProfile, count: usize) -> Vec<String> {
        let name = profile.name.as_str();
        let industry = profile.industry_label();
        let product = profile.primary_product();
        let sector = profile
            .sector
            .clone()
            .unwrap_or_else(|| industry.clone());
        let client = profile
            .clients
            .first()
            .cloned()
            .unwrap_or_else(|| "enterprises".to_string());

        let templates = match self {
            Self::Broad => vec![
                format!("{} competitors", name),
                format!("companies similar to {}", name),
                format!("{} alternatives", name),
                format!("top {} companies", industry),
                format!("{} providers comparison", product),
            ],
            Self::PlatformCommunity => vec![
                format!("{} alternatives site:g2.com", name),
                format!("{} vs reddit", name),
                format!("{} competitors capterra reviews", name),
                format!("{} alternatives product hunt", name),
                format!("{} tools comparison crunchbase", industry),
            ],
            Self::Niche => vec![
                format!("emerging {} startups", industry),
                format!("niche {} companies", product),
                format!("{} startups serving {}", industry, client),
                format!("new entrants {} {}", industry, sector),
                format!("specialized {} vendors like {}", product, name),
            ],
        };

        let count = count.clamp(Self::MIN_QUERIES, Self::MAX_QUERIES);
        let mut seen = std::collections::HashSet::new();
        templates
            .into_iter()
            .map(|q| q.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|q| seen.insert(q.to_lowercase()))
            .take(count)
            .collect()
    }
}
