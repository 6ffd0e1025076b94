//! Scripted provider responses.
//!
//! Prompts are routed by their `TASK:` header; extraction prompts are further
//! routed by the discovery strategy they were issued under.

use evidence::testing::{MockCompleter, MockWebSearcher};
use evidence::SearchHit;
use serde_json::json;

pub const COMPANY: &str = "Acme Analytics";

pub const REPORT: &str = "# Acme Analytics Research Report\n\n\
    ## Executive Summary\n\n\
    Acme Analytics competes in a crowded product analytics market.\n";

pub const FIVE_COMPETITORS: &[&str] = &[
    "Beta Insights",
    "Gamma Metrics",
    "Delta Dashboards",
    "Epsilon Data",
    "Zeta Labs",
];

/// One hit per query, with a url and snippet unique to that query.
pub fn search_hits(query: &str) -> Vec<SearchHit> {
    let slug = query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    SearchHit::from_url(&format!("https://news.example.com/{}", slug))
        .map(|hit| {
            vec![hit
                .with_title(format!("Results for {}", query))
                .with_snippet(format!("Coverage of {} across the analytics market.", query))
                .with_score(0.9)]
        })
        .unwrap_or_default()
}

pub fn searcher() -> MockWebSearcher {
    MockWebSearcher::new().with_responder(search_hits)
}

pub fn profile_json(description: &str) -> String {
    json!({
        "description": description,
        "industry": "product analytics",
        "sector": "software",
        "clients": ["retailers"],
        "partners": [],
        "products": ["analytics dashboard"],
    })
    .to_string()
}

pub fn mentions_json(names: &[&str]) -> String {
    let mentions: Vec<_> = names
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "source": 1,
                "confidence": 0.8,
                "category": "direct",
                "evidence": format!("{} is a leading alternative", name),
                "description": format!("{} builds analytics tools", name),
            })
        })
        .collect();
    serde_json::Value::Array(mentions).to_string()
}

/// Relevance ratings as the relevance-assessment completion returns them.
pub fn relevance_json(names: &[&str], relevance: f32) -> String {
    let ratings: Vec<_> = names
        .iter()
        .map(|name| json!({ "name": name, "relevance": relevance }))
        .collect();
    serde_json::Value::Array(ratings).to_string()
}

/// A completer where each `(strategy label, names)` pair scripts the
/// mentions extracted during rounds run with that strategy.
pub fn completer(rounds: &[(&str, &[&str])]) -> MockCompleter {
    scripted(MockCompleter::new(), rounds)
}

/// Append the standard rules after whatever `completer` already matches.
pub fn scripted(completer: MockCompleter, rounds: &[(&str, &[&str])]) -> MockCompleter {
    let mut completer = completer
        .with_response(
            "TASK: company-profile",
            profile_json("Acme Analytics builds product analytics dashboards for retailers."),
        )
        .with_response("TASK: section-brief", "- The market is consolidating [1]")
        .with_response("TASK: executive-report", REPORT);
    for (strategy, names) in rounds {
        completer = completer.with_response(
            &format!("Discovery strategy: {}\n", strategy),
            mentions_json(names),
        );
    }
    completer.with_default_response("[]")
}

/// Discovery passes in the first round.
pub fn passing_completer() -> MockCompleter {
    completer(&[("broad", FIVE_COMPETITORS)])
}
