//! Text similarity used to rank candidates against the company profile.
//!
//! Discovery prefers completion-backed ratings (see `relevance`); the scorer
//! here covers candidates those ratings miss.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

use crate::domains::research::models::CompetitorCandidate;

lazy_static! {
    static ref STOPWORDS: HashSet<&'static str> = [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it",
        "its", "of", "on", "or", "that", "the", "their", "this", "to", "with", "we", "our", "you",
        "your", "they", "was", "were", "will", "can", "also", "more", "than",
    ]
    .into_iter()
    .collect();
}

/// Scores how closely a candidate matches the company profile, in `0.0..=1.0`.
pub trait SimilarityScorer: Send + Sync {
    fn similarity(&self, candidate: &CompetitorCandidate, profile: &str) -> f32;
}

/// Cosine similarity over lowercase term-frequency vectors.
#[derive(Debug, Clone, Default)]
pub struct LexicalSimilarity;

impl LexicalSimilarity {
    pub fn new() -> Self {
        Self
    }

    fn term_frequencies(text: &str) -> HashMap<String, f32> {
        let mut counts = HashMap::new();
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= 2)
            .map(str::to_lowercase)
            .filter(|t| !STOPWORDS.contains(t.as_str()))
        {
            *counts.entry(token).or_insert(0.0) += 1.0;
        }
        counts
    }

    /// Cosine of the two texts' term-frequency vectors.
    pub fn cosine(a: &str, b: &str) -> f32 {
        let left = Self::term_frequencies(a);
        let right = Self::term_frequencies(b);
        if left.is_empty() || right.is_empty() {
            return 0.0;
        }

        let dot: f32 = left
            .iter()
            .filter_map(|(term, weight)| right.get(term).map(|other| weight * other))
            .sum();
        let norm = |v: &HashMap<String, f32>| v.values().map(|w| w * w).sum::<f32>().sqrt();

        (dot / (norm(&left) * norm(&right))).clamp(0.0, 1.0)
    }
}

impl SimilarityScorer for LexicalSimilarity {
    fn similarity(&self, candidate: &CompetitorCandidate, profile: &str) -> f32 {
        Self::cosine(&candidate.evidence_text(), profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_scores_one() {
        let score = LexicalSimilarity::cosine("marketing analytics dashboards", "Marketing analytics dashboards");
        assert!((score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_disjoint_text_scores_zero() {
        assert_eq!(LexicalSimilarity::cosine("rocket engines", "bakery bread"), 0.0);
    }

    #[test]
    fn test_stopwords_do_not_count() {
        assert_eq!(LexicalSimilarity::cosine("the and of", "the and of"), 0.0);
    }

    #[test]
    fn test_partial_overlap_is_between() {
        let score = LexicalSimilarity::cosine(
            "product analytics for mobile apps",
            "web analytics platform for marketers",
        );
        assert!(score > 0.0 && score < 1.0);
    }
}
