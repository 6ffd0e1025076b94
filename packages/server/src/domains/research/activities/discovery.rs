//! Discovery loop
//!
//! Pipeline, per round:
//! 1. Pick the round's fixed query strategy and build 3-5 queries
//! 2. Search them concurrently through the gateway
//! 3. Extract mentions from each query's documents
//! 4. Rate the relevance of candidates not rated in earlier rounds
//! 5. Rank all mentions gathered so far (this round plus earlier rounds)
//! 6. Evaluate the ranked set; stop at the first passing round
//!
//! When the iteration budget runs out, the last ranked set is accepted
//! and the outcome is degraded.

use std::collections::HashSet;

use futures::future::join_all;
use serde_json::json;
use tracing::info;

use super::context::PhaseContext;
use super::evaluator::evaluate;
use super::extract_mentions::extract_mentions;
use super::query_strategy::QueryStrategy;
use super::ranker::{candidate_pool, name_key, rank_candidates};
use super::relevance::RelevanceRatings;
use super::search::search_all;
use crate::domains::research::events::EventKind;
use crate::domains::research::models::{
    CompanyProfile, DiscoveryOutcome, EntityMention, PhaseOutcome, ResearchCategory,
};
use crate::error::{ResearchError, Result};

pub async fn run_discovery(
    ctx: &PhaseContext<'_>,
    profile: &CompanyProfile,
) -> Result<PhaseOutcome<DiscoveryOutcome>> {
    let settings = ctx.settings();
    let max_iterations = settings.discovery.max_iterations.max(1);

    let mut mentions: Vec<EntityMention> = Vec::new();
    let mut announced: HashSet<String> = HashSet::new();
    let mut ratings = RelevanceRatings::new();
    let mut failed_queries = 0;
    let mut outcome = None;

    for iteration in 1..=max_iterations {
        ctx.check_cancelled()?;

        let strategy = QueryStrategy::for_round(iteration);
        let queries = strategy.queries(profile, settings.discovery.queries_per_round);
        info!(
            job_id = %ctx.job_id,
            iteration,
            strategy = strategy.label(),
            queries = queries.len(),
            "Starting discovery round"
        );

        let results = search_all(
            ctx,
            queries
                .into_iter()
                .map(|q| (ResearchCategory::Competitor, q))
                .collect(),
            settings.discovery.results_per_query,
        )
        .await?;
        let round_failed = results.iter().filter(|r| r.failed()).count();
        failed_queries += round_failed;

        let extractions = join_all(
            results
                .iter()
                .map(|r| extract_mentions(ctx, profile, &r.query, strategy, r.documents())),
        )
        .await;
        for extracted in extractions {
            mentions.extend(extracted?);
        }
        ctx.check_cancelled()?;

        let pool = candidate_pool(&mentions, profile, &settings.ranker);
        ratings.assess(ctx, profile, &pool).await?;
        ctx.check_cancelled()?;

        let scorer = ratings.scorer(ctx.deps.similarity.as_ref());
        let candidates = rank_candidates(&mentions, profile, &scorer, &settings.ranker);

        for candidate in &candidates {
            if announced.insert(name_key(&candidate.name)) {
                ctx.emit(
                    EventKind::CandidateFound,
                    format!("Found competitor: {}", candidate.name),
                    json!({
                        "name": candidate.name,
                        "category": candidate.category,
                        "score": candidate.score,
                        "frequency": candidate.frequency,
                        "iteration": iteration,
                    }),
                )
                .await;
            }
        }

        let evaluation = evaluate(&candidates, profile, &settings.quality, iteration);
        info!(
            job_id = %ctx.job_id,
            iteration,
            candidates = candidates.len(),
            overall = evaluation.overall,
            pass = evaluation.pass,
            "Discovery round evaluated"
        );
        ctx.emit(
            EventKind::EvaluationComplete,
            format!(
                "Round {} ({}): {} candidates, quality {:.2}",
                iteration,
                strategy.label(),
                candidates.len(),
                evaluation.overall
            ),
            json!({
                "iteration": iteration,
                "strategy": strategy.label(),
                "candidate_count": candidates.len(),
                "overall": evaluation.overall,
                "scores": evaluation.scores,
                "pass": evaluation.pass,
                "issues": evaluation.issues,
                "recommendations": evaluation.recommendations,
                "failed_queries": round_failed,
            }),
        )
        .await;

        let passed = evaluation.pass;
        outcome = Some(DiscoveryOutcome {
            candidates,
            evaluation,
            iterations: iteration,
            passed,
            failed_queries,
        });
        if passed {
            break;
        }
    }

    let Some(outcome) = outcome else {
        return Err(ResearchError::Internal(
            "discovery produced no rounds".to_string(),
        ));
    };

    let passed = outcome.passed;
    let reason = format!(
        "discovery did not reach quality threshold after {} iterations: {}",
        outcome.iterations,
        outcome.evaluation.issues.join("; ")
    );
    Ok(PhaseOutcome::degraded_if(outcome, !passed, || reason))
}
