//! Content curation
//!
//! Per category:
//! 1. Normalize whitespace and stray encoding artifacts in the content
//! 2. Drop empty documents and those under the relevance threshold
//! 3. Dedupe by normalized url, keeping the highest-relevance copy
//! 4. Stable sort by relevance, descending
//! 5. Cap the number kept per category

use std::collections::HashMap;

use serde_json::json;
use tracing::{debug, info};
use url::Url;

use super::context::PhaseContext;
use crate::domains::research::events::EventKind;
use crate::domains::research::models::{Document, PhaseOutcome, ResearchCategory, ResearchState};
use crate::domains::research::settings::CuratorSettings;
use crate::error::Result;

/// Why a document was or was not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Kept,
    Empty,
    BelowThreshold,
    Duplicate,
    OverCap,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kept => "kept",
            Self::Empty => "empty",
            Self::BelowThreshold => "below_threshold",
            Self::Duplicate => "duplicate",
            Self::OverCap => "over_cap",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurationDecision {
    pub url: String,
    pub relevance: f32,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Default)]
pub struct CurationOutcome {
    /// Sorted by relevance, descending.
    pub kept: Vec<Document>,
    /// One per input document, in input order.
    pub decisions: Vec<CurationDecision>,
}

/// Canonical form of a url used as the dedupe key.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.trim_end_matches('/').to_lowercase();
    };

    url.set_fragment(None);

    if let Some(host) = url.host_str().map(str::to_lowercase) {
        if let Some(bare) = host.strip_prefix("www.") {
            let bare = bare.to_string();
            let _ = url.set_host(Some(&bare));
        }
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.to_ascii_lowercase().starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);

    url.to_string().trim_end_matches('/').to_string()
}

/// Collapse whitespace and strip control and replacement characters.
pub fn normalize_content(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c == '\u{FFFD}' || (c.is_control() && !c.is_whitespace()) {
                ' '
            } else {
                c
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Curate one category's documents. Pure.
pub fn curate(documents: Vec<Document>, settings: &CuratorSettings) -> CurationOutcome {
    let mut verdicts: Vec<Verdict> = Vec::with_capacity(documents.len());
    let mut normalized: Vec<Document> = Vec::with_capacity(documents.len());
    // Normalized url -> index of the best copy so far.
    let mut best: HashMap<String, usize> = HashMap::new();

    for (index, mut document) in documents.into_iter().enumerate() {
        document.content = normalize_content(&document.content);

        let verdict = if document.content.is_empty() && document.title.is_none() {
            Verdict::Empty
        } else if document.relevance < settings.relevance_threshold {
            Verdict::BelowThreshold
        } else {
            let key = normalize_url(&document.url);
            match best.get(&key).copied() {
                Some(previous) if normalized[previous].relevance >= document.relevance => {
                    Verdict::Duplicate
                }
                Some(previous) => {
                    verdicts[previous] = Verdict::Duplicate;
                    best.insert(key, index);
                    Verdict::Kept
                }
                None => {
                    best.insert(key, index);
                    Verdict::Kept
                }
            }
        };

        verdicts.push(verdict);
        normalized.push(document);
    }

    let mut survivors: Vec<usize> = (0..normalized.len())
        .filter(|&i| verdicts[i] == Verdict::Kept)
        .collect();
    // sort_by is stable, so equal relevance keeps input order.
    survivors.sort_by(|&a, &b| normalized[b].relevance.total_cmp(&normalized[a].relevance));
    for &index in survivors.iter().skip(settings.max_per_category) {
        verdicts[index] = Verdict::OverCap;
    }
    survivors.truncate(settings.max_per_category);

    let decisions = normalized
        .iter()
        .zip(&verdicts)
        .map(|(document, &verdict)| CurationDecision {
            url: document.url.clone(),
            relevance: document.relevance,
            verdict,
        })
        .collect();

    let kept = survivors.iter().map(|&i| normalized[i].clone()).collect();

    CurationOutcome { kept, decisions }
}

/// Curate every category of raw documents into `state.curated`.
///
/// Emits one `document_kept` or `document_discarded` event per document.
/// Degraded when nothing at all survives.
pub async fn curate_documents(
    ctx: &PhaseContext<'_>,
    state: &mut ResearchState,
) -> Result<PhaseOutcome<usize>> {
    let settings = &ctx.settings().curator;
    let raw = std::mem::take(&mut state.raw_documents);
    let total: usize = raw.values().map(Vec::len).sum();

    for (category, documents) in &raw {
        ctx.check_cancelled()?;
        let outcome = curate(documents.clone(), settings);
        emit_decisions(ctx, *category, &outcome.decisions).await;

        debug!(
            job_id = %ctx.job_id,
            category = %category,
            input = documents.len(),
            kept = outcome.kept.len(),
            "Curated category"
        );

        if !outcome.kept.is_empty() {
            state.curated.insert(*category, outcome.kept);
        }
    }
    state.raw_documents = raw;

    let kept = state.curated_count();
    info!(job_id = %ctx.job_id, total, kept, "Curation complete");

    Ok(PhaseOutcome::degraded_if(kept, total > 0 && kept == 0, || {
        "no documents passed curation".to_string()
    }))
}

async fn emit_decisions(
    ctx: &PhaseContext<'_>,
    category: ResearchCategory,
    decisions: &[CurationDecision],
) {
    for decision in decisions {
        let (kind, message) = match decision.verdict {
            Verdict::Kept => (EventKind::DocumentKept, format!("Kept {}", decision.url)),
            other => (
                EventKind::DocumentDiscarded,
                format!("Discarded {} ({})", decision.url, other.as_str()),
            ),
        };
        ctx.emit(
            kind,
            message,
            json!({
                "category": category,
                "url": decision.url,
                "relevance": decision.relevance,
                "reason": decision.verdict.as_str(),
            }),
        )
        .await;
    }
}
