//! Quality gate for a discovery round.
//!
//! Pure function of the candidate list, the profile and the thresholds, so
//! the same round always produces the same verdict and feedback.

use std::collections::HashSet;

use super::ranker::{is_generic_name, name_key};
use crate::domains::research::models::{
    CompanyProfile, CompetitorCandidate, DimensionScores, EvaluationResult,
};
use crate::domains::research::settings::QualityThresholds;

/// Bonus per distinct candidate category beyond the first.
const CATEGORY_BONUS: f32 = 0.1;

/// Below these the evaluator reports an advisory issue.
const LOW_DIVERSITY: f32 = 0.5;
const LOW_CONFIDENCE: f32 = 0.5;

pub fn evaluate(
    candidates: &[CompetitorCandidate],
    profile: &CompanyProfile,
    thresholds: &QualityThresholds,
    iteration: u32,
) -> EvaluationResult {
    let count = candidates.len();
    let min_required = thresholds.min_candidates.max(1);

    let scores = DimensionScores {
        quantity: (count as f32 / min_required as f32).min(1.0),
        relevance: relevance(candidates, thresholds.relevance_top_k),
        diversity: diversity(candidates),
        confidence: mean(candidates.iter().map(|c| c.confidence)),
    };

    let overall = weighted_overall(&scores, thresholds);

    let pass = overall >= thresholds.min_overall
        && scores.relevance >= thresholds.min_relevance
        && count >= min_required;

    let mut feedback = Feedback::default();

    if count < min_required {
        feedback.push(
            format!("insufficient quantity: found {}, need {}", count, min_required),
            "Broaden the query strategy with industry-specific and platform-specific terms",
        );
    }
    if scores.relevance < thresholds.min_relevance {
        feedback.push(
            format!(
                "low relevance: {:.2} below {:.2}",
                scores.relevance, thresholds.min_relevance
            ),
            format!(
                "Focus queries on companies with business models and target markets similar to {}",
                profile.name
            ),
        );
    }
    if overall < thresholds.min_overall {
        feedback.push(
            format!(
                "overall quality {:.2} below {:.2}",
                overall, thresholds.min_overall
            ),
            "Run another round with a different query strategy",
        );
    }
    if count > 0 && scores.diversity < LOW_DIVERSITY {
        feedback.push(
            format!("low source diversity: {:.2}", scores.diversity),
            "Draw candidates from more independent sources such as review platforms and industry directories",
        );
    }
    if count > 0 && scores.confidence < LOW_CONFIDENCE {
        feedback.push(
            format!("low confidence: {:.2}", scores.confidence),
            "Prefer candidates with direct evidence of product or market overlap",
        );
    }

    let generic = possibly_generic(candidates);
    if !generic.is_empty() {
        feedback.push(
            format!("possibly generic entries: {}", generic.join(", ")),
            "Filter out generic terms and keep specific company names",
        );
    }

    let duplicates = near_duplicates(candidates);
    if !duplicates.is_empty() {
        let pairs: Vec<String> = duplicates
            .iter()
            .map(|(a, b)| format!("{} / {}", a, b))
            .collect();
        feedback.push(
            format!("possible duplicate names: {}", pairs.join(", ")),
            "Merge or remove near-duplicate competitor names",
        );
    }

    EvaluationResult {
        iteration,
        candidate_count: count,
        overall,
        scores,
        pass,
        issues: feedback.issues,
        recommendations: feedback.recommendations,
    }
}

#[derive(Default)]
struct Feedback {
    issues: Vec<String>,
    recommendations: Vec<String>,
}

impl Feedback {
    fn push(&mut self, issue: impl Into<String>, recommendation: impl Into<String>) {
        self.issues.push(issue.into());
        let recommendation = recommendation.into();
        if !self.recommendations.contains(&recommendation) {
            self.recommendations.push(recommendation);
        }
    }
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f32
    }
}

/// Mean similarity of the top-K candidates in list order.
fn weighted_overall(scores: &DimensionScores, thresholds: &QualityThresholds) -> f32 {
    let total = thresholds.relevance_weight
        + thresholds.quantity_weight
        + thresholds.confidence_weight
        + thresholds.diversity_weight;
    if total <= 0.0 {
        return 0.0;
    }
    (thresholds.relevance_weight * scores.relevance
        + thresholds.quantity_weight * scores.quantity
        + thresholds.confidence_weight * scores.confidence
        + thresholds.diversity_weight * scores.diversity)
        / total
}

fn relevance(candidates: &[CompetitorCandidate], top_k: usize) -> f32 {
    mean(candidates.iter().take(top_k.max(1)).map(|c| c.similarity))
}

fn diversity(candidates: &[CompetitorCandidate]) -> f32 {
    if candidates.is_empty() {
        return 0.0;
    }
    let sources: HashSet<&str> = candidates
        .iter()
        .flat_map(|c| c.evidence.iter().map(|e| e.source_id.as_str()))
        .collect();
    let categories: HashSet<_> = candidates.iter().map(|c| c.category).collect();

    let source_ratio = (sources.len() as f32 / candidates.len() as f32).min(1.0);
    let bonus = CATEGORY_BONUS * categories.len().saturating_sub(1) as f32;
    (source_ratio + bonus).min(1.0)
}

/// Short names that contain a generic business word.
fn possibly_generic(candidates: &[CompetitorCandidate]) -> Vec<String> {
    candidates
        .iter()
        .filter(|c| {
            let key = name_key(&c.name);
            let words: Vec<&str> = key.split(' ').collect();
            c.name.chars().count() < 3
                || (words.len() <= 2 && words.iter().any(|w| is_generic_name(w, &[])))
        })
        .map(|c| c.name.clone())
        .collect()
}

/// Pairs whose names contain one another or share most of their words.
fn near_duplicates(candidates: &[CompetitorCandidate]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (i, a) in candidates.iter().enumerate() {
        for b in &candidates[i + 1..] {
            if names_look_alike(&name_key(&a.name), &name_key(&b.name)) {
                pairs.push((a.name.clone(), b.name.clone()));
            }
        }
    }
    pairs
}

fn names_look_alike(a: &str, b: &str) -> bool {
    let length_gap = a.chars().count().abs_diff(b.chars().count());
    if (a.contains(b) || b.contains(a)) && length_gap <= 3 {
        return true;
    }

    let words_a: HashSet<&str> = a.split(' ').collect();
    let words_b: HashSet<&str> = b.split(' ').collect();
    let shared = words_a.intersection(&words_b).count();
    let smaller = words_a.len().min(words_b.len());
    shared >= 2 && shared as f32 >= 0.7 * smaller as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::research::models::{CandidateCategory, SourceEvidence};

    fn candidate(
        name: &str,
        sources: &[&str],
        similarity: f32,
        confidence: f32,
        category: CandidateCategory,
    ) -> CompetitorCandidate {
        CompetitorCandidate {
            name: name.to_string(),
            category,
            description: None,
            evidence: sources
                .iter()
                .map(|s| SourceEvidence {
                    source_id: s.to_string(),
                    confidence,
                    snippet: None,
                })
                .collect(),
            frequency: sources.len() as u32,
            confidence,
            similarity,
            score: 0.0,
        }
    }

    fn profile() -> CompanyProfile {
        CompanyProfile::minimal("Acme Analytics", None)
    }

    #[test]
    fn test_strong_round_passes() {
        use CandidateCategory::*;
        let candidates = vec![
            candidate("Globex", &["s1"], 0.75, 0.8, Direct),
            candidate("Initech", &["s2"], 0.75, 0.8, Direct),
            candidate("Hooli", &["s3"], 0.75, 0.8, Indirect),
            candidate("Umbrella", &["s1"], 0.75, 0.8, Direct),
            candidate("Soylent", &["s2"], 0.75, 0.8, Direct),
        ];

        let result = evaluate(&candidates, &profile(), &QualityThresholds::default(), 1);

        assert!(result.pass);
        assert!((result.overall - 0.815).abs() < 0.01);
        assert_eq!(result.scores.quantity, 1.0);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_two_candidates_fail_on_quantity() {
        use CandidateCategory::*;
        let candidates = vec![
            candidate("Globex", &["s1"], 0.9, 0.9, Direct),
            candidate("Initech", &["s2"], 0.9, 0.9, Direct),
        ];

        let result = evaluate(&candidates, &profile(), &QualityThresholds::default(), 1);

        assert!(!result.pass);
        assert_eq!(result.scores.quantity, 0.5);
        assert_eq!(result.issues[0], "insufficient quantity: found 2, need 4");
        assert!(result.recommendations[0].contains("Broaden the query strategy"));
    }

    #[test]
    fn test_low_relevance_blocks_pass_even_with_good_overall() {
        use CandidateCategory::*;
        let candidates: Vec<_> = ["A1", "B2", "C3", "D4", "E5"]
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let source = format!("s{}", i);
                candidate(n, &[source.as_str()], 0.55, 1.0, Direct)
            })
            .collect();

        let result = evaluate(&candidates, &profile(), &QualityThresholds::default(), 2);

        assert!(result.overall >= 0.7);
        assert!(!result.pass);
        assert!(result.issues.iter().any(|i| i.starts_with("low relevance")));
    }

    #[test]
    fn test_overall_uses_configured_weights() {
        use CandidateCategory::*;
        let candidates = vec![
            candidate("Globex", &["s1"], 0.75, 0.3, Direct),
            candidate("Initech", &["s2"], 0.75, 0.3, Direct),
        ];
        let thresholds = QualityThresholds {
            relevance_weight: 2.0,
            quantity_weight: 0.0,
            confidence_weight: 0.0,
            diversity_weight: 0.0,
            ..QualityThresholds::default()
        };

        let result = evaluate(&candidates, &profile(), &thresholds, 1);

        assert!((result.overall - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_empty_set_scores_zero() {
        let result = evaluate(&[], &profile(), &QualityThresholds::default(), 3);
        assert_eq!(result.overall, 0.0);
        assert!(!result.pass);
        assert_eq!(result.candidate_count, 0);
        assert_eq!(result.issues[0], "insufficient quantity: found 0, need 4");
    }

    #[test]
    fn test_feedback_flags_generic_and_duplicate_names() {
        use CandidateCategory::*;
        let candidates = vec![
            candidate("Globex Software", &["s1"], 0.8, 0.8, Direct),
            candidate("Globex Softwares", &["s2"], 0.8, 0.8, Direct),
            candidate("Initech", &["s3"], 0.8, 0.8, Direct),
        ];

        let result = evaluate(&candidates, &profile(), &QualityThresholds::default(), 1);

        assert!(result
            .issues
            .iter()
            .any(|i| i == "possibly generic entries: Globex Software"));
        assert!(result
            .issues
            .iter()
            .any(|i| i == "possible duplicate names: Globex Software / Globex Softwares"));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        use CandidateCategory::*;
        let candidates = vec![
            candidate("Globex", &["s1", "s2"], 0.6, 0.7, Direct),
            candidate("Initech", &["s2"], 0.4, 0.5, Emerging),
        ];
        let a = evaluate(&candidates, &profile(), &QualityThresholds::default(), 1);
        let b = evaluate(&candidates, &profile(), &QualityThresholds::default(), 1);
        assert_eq!(a, b);
    }
}
