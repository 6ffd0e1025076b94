//! Evidence enrichment after discovery.
//!
//! Fans out one query per research category, the sector and client trend
//! queries, the requester's role focus queries and one per top competitor.
//! Failed queries degrade the phase; they never fail it.

use chrono::{Datelike, Utc};
use tracing::info;

use super::context::PhaseContext;
use super::role_focus::RoleFocus;
use super::search::search_all;
use crate::domains::research::models::{
    CompanyProfile, CompetitorCandidate, PhaseOutcome, ResearchCategory, ResearchState,
};
use crate::error::Result;

/// Client industries given their own trend query.
const MAX_CLIENT_TREND_QUERIES: usize = 2;

pub fn enrichment_queries(
    profile: &CompanyProfile,
    competitors: &[CompetitorCandidate],
    focus: RoleFocus,
    max_competitors: usize,
    year: i32,
) -> Vec<(ResearchCategory, String)> {
    let name = &profile.name;
    let sector = profile
        .sector
        .clone()
        .unwrap_or_else(|| profile.industry_label());
    let mut queries = vec![
        (
            ResearchCategory::Company,
            format!("{} business model strategy", name),
        ),
        (
            ResearchCategory::Industry,
            format!("{} industry trends {}", profile.industry_label(), year),
        ),
        (
            ResearchCategory::SectorTrends,
            format!("{} market trends {}", sector, year),
        ),
        (
            ResearchCategory::SectorTrends,
            format!("{} industry outlook {}", sector, year),
        ),
        (
            ResearchCategory::Financial,
            format!("{} revenue funding financials", name),
        ),
        (ResearchCategory::News, format!("{} latest news", name)),
    ];
    queries.extend(
        profile
            .clients
            .iter()
            .take(MAX_CLIENT_TREND_QUERIES)
            .map(|client| {
                (
                    ResearchCategory::ClientTrends,
                    format!("{} industry trends {}", client, year),
                )
            }),
    );
    queries.extend(focus.queries(profile, year));
    queries.extend(competitors.iter().take(max_competitors).map(|c| {
        (
            ResearchCategory::Competitor,
            format!("{} company overview products", c.name),
        )
    }));
    queries
}

pub async fn enrich(
    ctx: &PhaseContext<'_>,
    profile: &CompanyProfile,
    competitors: &[CompetitorCandidate],
    focus: RoleFocus,
    state: &mut ResearchState,
) -> Result<PhaseOutcome<usize>> {
    let settings = &ctx.settings().enrichment;
    let queries = enrichment_queries(
        profile,
        competitors,
        focus,
        settings.max_competitors,
        Utc::now().year(),
    );
    let issued = queries.len();

    let results = search_all(ctx, queries, settings.results_per_query).await?;

    let failed: Vec<String> = results
        .iter()
        .filter(|r| r.failed())
        .map(|r| r.query.clone())
        .collect();
    let gathered: usize = results.iter().map(|r| r.documents().len()).sum();
    state.add_documents(
        results
            .into_iter()
            .filter_map(|r| r.outcome.ok())
            .flatten(),
    );

    info!(
        job_id = %ctx.job_id,
        queries = issued,
        focus = focus.as_str(),
        failed = failed.len(),
        documents = gathered,
        "Enrichment complete"
    );

    Ok(PhaseOutcome::degraded_if(gathered, !failed.is_empty(), || {
        format!(
            "{} of {} enrichment queries failed: {}",
            failed.len(),
            issued,
            failed.join(", ")
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with_clients() -> CompanyProfile {
        CompanyProfile {
            name: "Acme".into(),
            sector: Some("software".into()),
            clients: vec!["retail".into(), "banking".into(), "insurance".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_queries_cover_every_category_and_cap_competitors() {
        let competitors: Vec<_> = (0..12)
            .map(|i| CompetitorCandidate::manual(format!("Rival {}", i)))
            .collect();

        let queries = enrichment_queries(
            &profile_with_clients(),
            &competitors,
            RoleFocus::Strategy,
            8,
            2026,
        );

        for category in ResearchCategory::ALL {
            assert!(queries.iter().any(|(c, _)| *c == category));
        }
        let competitor_queries = queries
            .iter()
            .filter(|(c, _)| *c == ResearchCategory::Competitor)
            .count();
        assert_eq!(competitor_queries, 8);
        assert!(queries.iter().any(|(_, q)| q == "software industry trends 2026"));
        assert!(queries.iter().any(|(_, q)| q == "software market trends 2026"));
    }

    #[test]
    fn test_client_trends_capped_and_skipped_without_clients() {
        let queries = enrichment_queries(&profile_with_clients(), &[], RoleFocus::Strategy, 8, 2026);
        let client_queries: Vec<&str> = queries
            .iter()
            .filter(|(c, _)| *c == ResearchCategory::ClientTrends)
            .map(|(_, q)| q.as_str())
            .collect();
        assert_eq!(
            client_queries,
            vec!["retail industry trends 2026", "banking industry trends 2026"]
        );

        let bare = CompanyProfile::minimal("Acme", None);
        let queries = enrichment_queries(&bare, &[], RoleFocus::Strategy, 8, 2026);
        assert!(!queries.iter().any(|(c, _)| *c == ResearchCategory::ClientTrends));
        assert!(queries.iter().any(|(_, q)| q == "Acme market market trends 2026"));
    }

    #[test]
    fn test_role_focus_adds_its_queries() {
        let profile = profile_with_clients();

        let product = enrichment_queries(&profile, &[], RoleFocus::Product, 8, 2026);
        let finance = enrichment_queries(&profile, &[], RoleFocus::Finance, 8, 2026);

        assert!(product.iter().any(|(_, q)| q == "Acme product roadmap new features"));
        assert!(!finance.iter().any(|(_, q)| q == "Acme product roadmap new features"));
        assert!(finance
            .iter()
            .any(|(c, q)| *c == ResearchCategory::Financial && q == "Acme valuation investors acquisitions"));
    }
}
