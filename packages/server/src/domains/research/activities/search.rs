//! Concurrent search fan-out through the evidence gateway.

use evidence::EvidenceError;
use futures::future::join_all;
use serde_json::json;
use tracing::{debug, warn};

use super::context::PhaseContext;
use crate::domains::research::events::EventKind;
use crate::domains::research::models::{Document, ResearchCategory};
use crate::error::{ResearchError, Result};

/// Outcome of one query in a fan-out.
#[derive(Debug)]
pub struct QueryResult {
    pub category: ResearchCategory,
    pub query: String,
    pub outcome: std::result::Result<Vec<Document>, EvidenceError>,
}

impl QueryResult {
    pub fn documents(&self) -> &[Document] {
        self.outcome.as_deref().unwrap_or_default()
    }

    pub fn failed(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Issue every query concurrently and wait for all of them.
///
/// The gateway bounds how many actually run at once. Individual failures
/// come back in their `QueryResult`; cancellation and exhausted capacity
/// fail the whole fan-out.
pub async fn search_all(
    ctx: &PhaseContext<'_>,
    queries: Vec<(ResearchCategory, String)>,
    max_results: usize,
) -> Result<Vec<QueryResult>> {
    ctx.check_cancelled()?;

    for (category, query) in &queries {
        ctx.emit(
            EventKind::QueryIssued,
            format!("Searching: {}", query),
            json!({ "query": query, "category": category }),
        )
        .await;
    }

    let gateway = &ctx.deps.gateway;
    let cancel = ctx.cancel;
    let searches = queries.into_iter().map(|(category, query)| async move {
        let outcome = gateway
            .search(&query, max_results, cancel)
            .await
            .map(|hits| {
                hits.into_iter()
                    .map(|hit| Document::from_hit(hit, category))
                    .collect::<Vec<_>>()
            });
        QueryResult {
            category,
            query,
            outcome,
        }
    });
    let results = join_all(searches).await;

    // In-flight calls drain first; their results are discarded.
    ctx.check_cancelled()?;

    for result in &results {
        match &result.outcome {
            Ok(documents) => debug!(
                job_id = %ctx.job_id,
                query = %result.query,
                documents = documents.len(),
                "Search returned"
            ),
            Err(error) => {
                warn!(
                    job_id = %ctx.job_id,
                    query = %result.query,
                    error = %error,
                    "Search failed"
                );
                if let Some(fatal) = ResearchError::escalate(error) {
                    return Err(fatal);
                }
            }
        }
    }

    Ok(results)
}
