//! Candidate ranking.
//!
//! Pipeline:
//! 1. Clean each mentioned name (quotes, whitespace, legal suffixes)
//! 2. Deduplicate by normalized name, unioning source evidence
//! 3. Score similarity of the evidence text to the company profile
//! 4. Composite = weighted frequency + similarity + mean source confidence
//! 5. Sort descending, drop unusable names, cap the list

use std::collections::HashSet;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use super::similarity::SimilarityScorer;
use crate::domains::research::models::{CompanyProfile, CompetitorCandidate, EntityMention};
use crate::domains::research::settings::RankerSettings;

lazy_static! {
    static ref LEGAL_SUFFIX: Regex = Regex::new(
        r"(?i)[,\s]+(inc\.?|incorporated|corp\.?|corporation|llc|l\.l\.c\.|ltd\.?|limited|co\.?|gmbh|plc|s\.a\.)$"
    )
    .unwrap();

    /// Words that never name a specific company on their own.
    static ref GENERIC_WORDS: HashSet<&'static str> = [
        "and", "or", "the", "a", "an", "inc", "corp", "llc", "ltd", "co", "company", "companies",
        "business", "businesses", "enterprise", "enterprises", "startup", "startups", "similar",
        "alternative", "alternatives", "competitor", "competitors", "like", "such", "as",
        "solutions", "platform", "platforms", "tools", "tool", "services", "software", "systems",
        "products", "providers", "vendors", "other", "others", "various", "etc",
    ]
    .into_iter()
    .collect();
}

/// Display form of a mentioned name, or `None` when nothing usable remains.
pub fn clean_name(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '“' | '”'))
        .trim();
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");

    let stripped = LEGAL_SUFFIX.replace(&collapsed, "");
    let name = if stripped.chars().count() > 2 {
        stripped.trim().to_string()
    } else {
        collapsed
    };

    (!name.is_empty()).then_some(name)
}

/// Case-insensitive, whitespace-normalized dedupe key.
pub fn name_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a name reads as a generic phrase rather than a company.
pub fn is_generic_name(name: &str, extra_denylist: &[String]) -> bool {
    let key = name_key(name);
    if extra_denylist.iter().any(|d| name_key(d) == key) {
        return true;
    }
    let words: Vec<&str> = key
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    !words.is_empty() && words.iter().all(|w| GENERIC_WORDS.contains(w))
}

fn is_acceptable(name: &str, target_key: &str, settings: &RankerSettings) -> bool {
    name.chars().count() >= 2
        && name.chars().any(char::is_alphabetic)
        && name_key(name) != target_key
        && !is_generic_name(name, &settings.denylist)
}

/// Merge candidates that share a normalized name, keeping first-seen order.
///
/// Idempotent: deduplicating an already deduplicated list returns it
/// unchanged, and so does deduplicating a list concatenated with itself.
pub fn dedupe_candidates(
    candidates: impl IntoIterator<Item = CompetitorCandidate>,
) -> Vec<CompetitorCandidate> {
    let mut merged: IndexMap<String, CompetitorCandidate> = IndexMap::new();
    for candidate in candidates {
        match merged.get_mut(&name_key(&candidate.name)) {
            Some(existing) => existing.merge(candidate),
            None => {
                merged.insert(name_key(&candidate.name), candidate);
            }
        }
    }
    merged.into_values().collect()
}

fn cleaned(mentions: &[EntityMention]) -> impl Iterator<Item = CompetitorCandidate> + '_ {
    mentions
        .iter()
        .filter_map(|m| clean_name(&m.name).map(|name| CompetitorCandidate::from_mention(name, m)))
}

/// Deduplicated candidates that pass the name filters, unscored and unsorted.
pub fn candidate_pool(
    mentions: &[EntityMention],
    profile: &CompanyProfile,
    settings: &RankerSettings,
) -> Vec<CompetitorCandidate> {
    let target_key = name_key(&profile.name);
    let mut pool = dedupe_candidates(cleaned(mentions));
    pool.retain(|c| is_acceptable(&c.name, &target_key, settings));
    pool
}

/// Turn raw mentions into a ranked, capped candidate list.
pub fn rank_candidates(
    mentions: &[EntityMention],
    profile: &CompanyProfile,
    scorer: &dyn SimilarityScorer,
    settings: &RankerSettings,
) -> Vec<CompetitorCandidate> {
    let mut ranked = dedupe_candidates(cleaned(mentions));

    let profile_text = profile.similarity_text();
    let max_frequency = ranked.iter().map(|c| c.frequency).max().unwrap_or(1).max(1) as f32;
    let weight_sum =
        settings.frequency_weight + settings.similarity_weight + settings.confidence_weight;
    let weight_sum = if weight_sum > 0.0 { weight_sum } else { 1.0 };

    for candidate in ranked.iter_mut() {
        let similarity = scorer.similarity(candidate, &profile_text);
        candidate.similarity = similarity.clamp(0.0, 1.0);
        let frequency = candidate.frequency as f32 / max_frequency;
        candidate.score = (settings.frequency_weight * frequency
            + settings.similarity_weight * candidate.similarity
            + settings.confidence_weight * candidate.mean_source_confidence())
            / weight_sum;
    }

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| name_key(&a.name).cmp(&name_key(&b.name)))
    });

    let target_key = name_key(&profile.name);
    ranked.retain(|c| is_acceptable(&c.name, &target_key, settings));
    ranked.truncate(settings.max_candidates);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::research::activities::similarity::LexicalSimilarity;
    use crate::domains::research::models::CandidateCategory;
    use proptest::prelude::*;

    fn mention(name: &str, source: &str, confidence: f32) -> EntityMention {
        EntityMention {
            name: name.to_string(),
            source_id: source.to_string(),
            confidence,
            category: CandidateCategory::Direct,
            snippet: Some("marketing analytics dashboards".to_string()),
            description: None,
        }
    }

    fn profile() -> CompanyProfile {
        CompanyProfile {
            name: "Acme Analytics".into(),
            description: "Marketing analytics dashboards for ecommerce teams".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_name_strips_quotes_and_suffixes() {
        assert_eq!(clean_name("  \"Globex Corp.\" ").as_deref(), Some("Globex"));
        assert_eq!(clean_name("Initech,  LLC").as_deref(), Some("Initech"));
        assert_eq!(clean_name("Co Inc").as_deref(), Some("Co Inc"));
        assert_eq!(clean_name("   "), None);
    }

    #[test]
    fn test_generic_names_are_detected() {
        assert!(is_generic_name("Software Companies", &[]));
        assert!(is_generic_name("the alternatives", &[]));
        assert!(!is_generic_name("Globex Software", &[]));
        assert!(is_generic_name("Hooli", &["hooli".to_string()]));
    }

    #[test]
    fn test_dedupe_merges_case_and_whitespace_variants() {
        let mentions = [
            mention("Globex", "s1", 0.6),
            mention("  globex ", "s2", 0.8),
            mention("GLOBEX", "s1", 0.9),
        ];
        let ranked = rank_candidates(
            &mentions,
            &profile(),
            &LexicalSimilarity::new(),
            &RankerSettings::default(),
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "Globex");
        assert_eq!(ranked[0].frequency, 2);
        assert!((ranked[0].confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_filters_target_generic_and_short_names() {
        let mentions = [
            mention("Acme Analytics", "s1", 0.9),
            mention("software companies", "s1", 0.9),
            mention("X", "s1", 0.9),
            mention("1234", "s1", 0.9),
            mention("Globex", "s1", 0.9),
        ];
        let ranked = rank_candidates(
            &mentions,
            &profile(),
            &LexicalSimilarity::new(),
            &RankerSettings::default(),
        );

        let names: Vec<_> = ranked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Globex"]);
    }

    #[test]
    fn test_pool_applies_name_filters_before_scoring() {
        let mentions = [
            mention("Acme Analytics", "s1", 0.9),
            mention("the alternatives", "s1", 0.9),
            mention("Globex Inc.", "s1", 0.9),
            mention("globex", "s2", 0.7),
        ];

        let pool = candidate_pool(&mentions, &profile(), &RankerSettings::default());

        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].name, "Globex");
        assert_eq!(pool[0].frequency, 2);
        assert_eq!(pool[0].similarity, 0.0);
    }

    #[test]
    fn test_more_sources_rank_higher() {
        let mentions = [
            mention("Initech", "s1", 0.7),
            mention("Globex", "s1", 0.7),
            mention("Globex", "s2", 0.7),
            mention("Globex", "s3", 0.7),
        ];
        let ranked = rank_candidates(
            &mentions,
            &profile(),
            &LexicalSimilarity::new(),
            &RankerSettings::default(),
        );

        assert_eq!(ranked[0].name, "Globex");
        assert!(ranked[0].score > ranked[1].score);
        assert!(ranked.iter().all(|c| (0.0..=1.0).contains(&c.score)));
    }

    #[test]
    fn test_output_is_capped() {
        let mentions: Vec<_> = (0..40)
            .map(|i| mention(&format!("Vendor {}", i), &format!("s{}", i), 0.5))
            .collect();
        let ranked = rank_candidates(
            &mentions,
            &profile(),
            &LexicalSimilarity::new(),
            &RankerSettings::default(),
        );
        assert_eq!(ranked.len(), 15);
    }

    fn arb_candidate() -> impl Strategy<Value = CompetitorCandidate> {
        (
            prop::sample::select(vec!["Globex", "globex", "Initech", " Hooli ", "Umbrella"]),
            prop::sample::select(vec!["s1", "s2", "s3"]),
            0.0f32..=1.0,
        )
            .prop_map(|(name, source, confidence)| {
                CompetitorCandidate::from_mention(name.trim(), &mention(name, source, confidence))
            })
    }

    proptest! {
        #[test]
        fn prop_dedupe_is_idempotent(candidates in prop::collection::vec(arb_candidate(), 0..20)) {
            let once = dedupe_candidates(candidates);
            let twice = dedupe_candidates(once.clone());
            prop_assert_eq!(&twice, &once);

            let doubled = dedupe_candidates(once.iter().cloned().chain(once.iter().cloned()));
            prop_assert_eq!(&doubled, &once);
        }

        #[test]
        fn prop_dedupe_keys_are_unique(candidates in prop::collection::vec(arb_candidate(), 0..20)) {
            let deduped = dedupe_candidates(candidates);
            let keys: HashSet<String> = deduped.iter().map(|c| name_key(&c.name)).collect();
            prop_assert_eq!(keys.len(), deduped.len());
        }
    }
}
