//! Requester role focus
//!
//! Maps the free-text role a job was submitted with onto the area that role
//! watches most closely. The focus adds its own enrichment queries and a
//! list of focus topics to the report prompt. Jobs without a role get the
//! general strategy focus.

use serde::Serialize;

use crate::domains::research::models::{CompanyProfile, ResearchCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleFocus {
    Product,
    GoToMarket,
    Finance,
    Technology,
    Strategy,
}

const FINANCE_WORDS: &[&str] = &[
    "cfo", "finance", "financial", "investor", "investment", "treasury", "controller",
    "accounting",
];
const TECHNOLOGY_WORDS: &[&str] = &[
    "cto", "cio", "engineer", "engineering", "technology", "technical", "developer", "architect",
    "data", "it",
];
const PRODUCT_WORDS: &[&str] = &["product", "pm", "ux", "design", "designer"];
const GO_TO_MARKET_WORDS: &[&str] = &[
    "cmo", "marketing", "marketer", "sales", "growth", "brand", "partnerships", "customer",
    "commercial",
];

impl RoleFocus {
    /// Keyword match on the role's words; finance and technology titles win
    /// over the broader product and go-to-market ones.
    pub fn infer(role: Option<&str>) -> Self {
        let Some(role) = role else {
            return Self::Strategy;
        };
        let words: Vec<String> = role
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let mentions = |list: &[&str]| words.iter().any(|w| list.contains(&w.as_str()));

        if mentions(FINANCE_WORDS) {
            Self::Finance
        } else if mentions(TECHNOLOGY_WORDS) {
            Self::Technology
        } else if mentions(PRODUCT_WORDS) {
            Self::Product
        } else if mentions(GO_TO_MARKET_WORDS) {
            Self::GoToMarket
        } else {
            Self::Strategy
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::GoToMarket => "go_to_market",
            Self::Finance => "finance",
            Self::Technology => "technology",
            Self::Strategy => "strategy",
        }
    }

    /// Topics the report should emphasise for this role.
    pub fn interests(self) -> &'static [&'static str] {
        match self {
            Self::Product => &[
                "feature gaps against competitors",
                "customer needs",
                "product roadmap signals",
            ],
            Self::GoToMarket => &[
                "pricing and positioning",
                "buyer behaviour",
                "channel and partnership moves",
            ],
            Self::Finance => &[
                "funding and valuation",
                "market size and growth",
                "acquisitions",
            ],
            Self::Technology => &[
                "technology platforms",
                "emerging technologies",
                "build versus buy options",
            ],
            Self::Strategy => &[
                "competitive positioning",
                "market expansion",
                "strategic partnerships",
            ],
        }
    }

    /// Extra enrichment queries for this focus.
    pub fn queries(self, profile: &CompanyProfile, year: i32) -> Vec<(ResearchCategory, String)> {
        let name = &profile.name;
        let industry = profile.industry_label();
        match self {
            Self::Product => vec![
                (
                    ResearchCategory::Company,
                    format!("{} product roadmap new features", name),
                ),
                (
                    ResearchCategory::Industry,
                    format!("{} customer needs {}", industry, year),
                ),
            ],
            Self::GoToMarket => vec![
                (
                    ResearchCategory::Company,
                    format!("{} pricing positioning customers", name),
                ),
                (
                    ResearchCategory::Industry,
                    format!("{} buyer behavior {}", industry, year),
                ),
            ],
            Self::Finance => vec![
                (
                    ResearchCategory::Financial,
                    format!("{} valuation investors acquisitions", name),
                ),
                (
                    ResearchCategory::Industry,
                    format!("{} market size growth {}", industry, year),
                ),
            ],
            Self::Technology => vec![
                (
                    ResearchCategory::Company,
                    format!("{} technology platform architecture", name),
                ),
                (
                    ResearchCategory::Industry,
                    format!("{} emerging technologies {}", industry, year),
                ),
            ],
            Self::Strategy => vec![
                (
                    ResearchCategory::Company,
                    format!("{} strategic partnerships expansion", name),
                ),
                (
                    ResearchCategory::Industry,
                    format!("{} market outlook {}", industry, year),
                ),
            ],
        }
    }
}
