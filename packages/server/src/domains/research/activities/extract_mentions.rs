//! Mention extraction
//!
//! Batches one query's documents into a single completion that lists the
//! companies they mention as competitors. Output is a JSON array; anything
//! unparseable is dropped with a warning rather than failing the round.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::context::PhaseContext;
use super::query_strategy::QueryStrategy;
use crate::domains::research::models::{CandidateCategory, CompanyProfile, Document, EntityMention};
use crate::error::{ResearchError, Result};

const MAX_DOCUMENT_CHARS: usize = 2000;
const DEFAULT_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Deserialize)]
struct RawMention {
    name: String,
    #[serde(default)]
    source: Option<Value>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    evidence: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Ask the completer which competitors `documents` mention.
///
/// Provider failures that do not end the job yield an empty list.
pub async fn extract_mentions(
    ctx: &PhaseContext<'_>,
    profile: &CompanyProfile,
    query: &str,
    strategy: QueryStrategy,
    documents: &[Document],
) -> Result<Vec<EntityMention>> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }

    let prompt = build_extraction_prompt(profile, query, strategy, documents);
    let response = match ctx.deps.gateway.complete(&prompt, ctx.cancel).await {
        Ok(response) => response,
        Err(error) => {
            if let Some(fatal) = ResearchError::escalate(&error) {
                return Err(fatal);
            }
            warn!(job_id = %ctx.job_id, query, error = %error, "Mention extraction failed");
            return Ok(Vec::new());
        }
    };

    let mentions = parse_mentions(&response, documents);
    debug!(
        job_id = %ctx.job_id,
        query,
        mentions = mentions.len(),
        "Extracted mentions"
    );
    Ok(mentions)
}

fn build_extraction_prompt(
    profile: &CompanyProfile,
    query: &str,
    strategy: QueryStrategy,
    documents: &[Document],
) -> String {
    let mut prompt = String::from("TASK: competitor-extraction\n\n");
    prompt.push_str(&format!("Target company: {}\n", profile.name));
    if !profile.description.is_empty() {
        prompt.push_str(&format!("Company description: {}\n", profile.description));
    }
    prompt.push_str(&format!("Industry: {}\n", profile.industry_label()));
    prompt.push_str(&format!("Search query: {}\n", query));
    prompt.push_str(&format!("Discovery strategy: {}\n\n", strategy.label()));

    prompt.push_str("## Documents\n\n");
    for (i, document) in documents.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] {} ({})\n{}\n\n",
            i + 1,
            document.label(),
            document.url,
            truncate(&document.content, MAX_DOCUMENT_CHARS),
        ));
    }

    prompt.push_str(&format!(
        "## Response Format\n\n\
         List every company the documents present as a competitor or alternative to {}.\n\
         Do not include {} itself or generic phrases.\n\
         Respond with only a JSON array:\n\
         [{{\"name\": \"Company\", \"source\": 1, \"confidence\": 0.8, \
         \"category\": \"direct|indirect|emerging\", \
         \"evidence\": \"short quote\", \"description\": \"one line\"}}]\n",
        profile.name, profile.name
    ));

    prompt
}

/// Parse the completion's JSON array, skipping malformed entries.
pub(crate) fn parse_mentions(response: &str, documents: &[Document]) -> Vec<EntityMention> {
    let Some(json) = json_slice(response, '[', ']') else {
        warn!("Extraction response contained no JSON array");
        return Vec::new();
    };
    let items: Vec<Value> = match serde_json::from_str(json) {
        Ok(items) => items,
        Err(error) => {
            warn!(error = %error, "Could not parse extraction response");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawMention>(item).ok())
        .filter(|raw| !raw.name.trim().is_empty())
        .map(|raw| EntityMention {
            source_id: resolve_source(raw.source.as_ref(), documents),
            confidence: raw.confidence.unwrap_or(DEFAULT_CONFIDENCE).clamp(0.0, 1.0),
            category: raw
                .category
                .as_deref()
                .map(CandidateCategory::parse_lenient)
                .unwrap_or_default(),
            snippet: raw.evidence.filter(|e| !e.trim().is_empty()),
            description: raw.description.filter(|d| !d.trim().is_empty()),
            name: raw.name,
        })
        .collect()
}

/// Map a 1-based index or url back to a document url; defaults to the first.
fn resolve_source(source: Option<&Value>, documents: &[Document]) -> String {
    let by_index = source
        .and_then(Value::as_u64)
        .and_then(|i| documents.get((i as usize).checked_sub(1)?));
    let by_url = source
        .and_then(Value::as_str)
        .and_then(|url| documents.iter().find(|d| d.url == url));

    by_index
        .or(by_url)
        .or_else(|| documents.first())
        .map(|d| d.url.clone())
        .unwrap_or_default()
}

/// Slice from the first `open` to the last `close`, inclusive.
pub(crate) fn json_slice(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
