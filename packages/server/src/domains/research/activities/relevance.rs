//! Competitor relevance ratings
//!
//! Each discovery round asks one completion to rate the candidates that have
//! no rating yet, from 0.0 (unrelated) to 1.0 (a direct competitor customers
//! would compare against the target). Ratings carry over between rounds.
//! Candidates the completion leaves unrated fall back to the configured
//! [`SimilarityScorer`].

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::context::PhaseContext;
use super::extract_mentions::{json_slice, truncate};
use super::ranker::{clean_name, name_key};
use super::similarity::SimilarityScorer;
use crate::domains::research::models::{CompanyProfile, CompetitorCandidate};
use crate::error::{ResearchError, Result};

/// Candidates rated per completion, most frequently mentioned first.
const MAX_RATED_PER_ROUND: usize = 30;
const MAX_CONTEXT_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct RawRating {
    name: String,
    relevance: f32,
}

/// Relevance ratings keyed by normalized candidate name.
#[derive(Debug, Clone, Default)]
pub struct RelevanceRatings {
    ratings: HashMap<String, f32>,
}

impl RelevanceRatings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.ratings.get(&name_key(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Rate the candidates in `pool` that have no rating yet.
    ///
    /// Returns how many new ratings were recorded. A failed or unparseable
    /// completion leaves the candidates unrated.
    pub async fn assess(
        &mut self,
        ctx: &PhaseContext<'_>,
        profile: &CompanyProfile,
        pool: &[CompetitorCandidate],
    ) -> Result<usize> {
        let mut unrated: Vec<&CompetitorCandidate> = pool
            .iter()
            .filter(|c| self.get(&c.name).is_none())
            .collect();
        if unrated.is_empty() {
            return Ok(0);
        }
        unrated.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        unrated.truncate(MAX_RATED_PER_ROUND);

        let prompt = build_relevance_prompt(profile, &unrated);
        let response = match ctx.deps.gateway.complete(&prompt, ctx.cancel).await {
            Ok(response) => response,
            Err(error) => {
                if let Some(fatal) = ResearchError::escalate(&error) {
                    return Err(fatal);
                }
                warn!(job_id = %ctx.job_id, error = %error, "Relevance assessment failed");
                return Ok(0);
            }
        };

        let asked: HashSet<String> = unrated.iter().map(|c| name_key(&c.name)).collect();
        let before = self.ratings.len();
        for (key, relevance) in parse_ratings(&response) {
            if asked.contains(&key) {
                self.ratings.entry(key).or_insert(relevance);
            }
        }
        let rated = self.ratings.len() - before;

        debug!(
            job_id = %ctx.job_id,
            asked = unrated.len(),
            rated,
            "Assessed candidate relevance"
        );
        Ok(rated)
    }

    /// Scorer that prefers these ratings and asks `fallback` for the rest.
    pub fn scorer<'a>(&'a self, fallback: &'a dyn SimilarityScorer) -> RatedSimilarity<'a> {
        RatedSimilarity {
            ratings: self,
            fallback,
        }
    }
}

pub struct RatedSimilarity<'a> {
    ratings: &'a RelevanceRatings,
    fallback: &'a dyn SimilarityScorer,
}

impl SimilarityScorer for RatedSimilarity<'_> {
    fn similarity(&self, candidate: &CompetitorCandidate, profile: &str) -> f32 {
        self.ratings
            .get(&candidate.name)
            .unwrap_or_else(|| self.fallback.similarity(candidate, profile))
    }
}

fn build_relevance_prompt(profile: &CompanyProfile, candidates: &[&CompetitorCandidate]) -> String {
    let mut prompt = String::from("TASK: relevance-assessment\n\n");
    let _ = writeln!(prompt, "Target company: {}", profile.name);
    if !profile.description.is_empty() {
        let _ = writeln!(prompt, "Company description: {}", profile.description);
    }
    let _ = writeln!(prompt, "Industry: {}", profile.industry_label());
    if !profile.products.is_empty() {
        let _ = writeln!(prompt, "Products: {}", profile.products.join(", "));
    }

    prompt.push_str("\n## Candidates\n\n");
    for candidate in candidates {
        let context = candidate
            .description
            .as_deref()
            .or_else(|| candidate.evidence.iter().find_map(|e| e.snippet.as_deref()))
            .unwrap_or("");
        let _ = writeln!(
            prompt,
            "- {}: {}",
            candidate.name,
            truncate(context, MAX_CONTEXT_CHARS)
        );
    }

    let _ = write!(
        prompt,
        "\n## Response Format\n\n\
         Rate each candidate's relevance as a competitor to {name} from 0.0 to 1.0, \
         judging overlap in products or services, target customers, business model \
         and market.\n\
         1.0 = direct competitor customers would compare with {name}\n\
         0.8 = relevant competitor\n\
         0.6 = partial overlap\n\
         0.4 = weak overlap\n\
         0.2 = barely related\n\
         0.0 = unrelated\n\
         Respond with only a JSON array:\n\
         [{{\"name\": \"Company\", \"relevance\": 0.8}}]\n",
        name = profile.name
    );
    prompt
}

/// Parse `[{name, relevance}]`, keyed by normalized name, skipping bad entries.
fn parse_ratings(response: &str) -> Vec<(String, f32)> {
    let Some(json) = json_slice(response, '[', ']') else {
        warn!("Relevance response contained no JSON array");
        return Vec::new();
    };
    let items: Vec<Value> = match serde_json::from_str(json) {
        Ok(items) => items,
        Err(error) => {
            warn!(error = %error, "Could not parse relevance response");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawRating>(item).ok())
        .filter(|raw| raw.relevance.is_finite())
        .filter_map(|raw| {
            let name = clean_name(&raw.name)?;
            Some((name_key(&name), raw.relevance.clamp(0.0, 1.0)))
        })
        .collect()
}
