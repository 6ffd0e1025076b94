//! End-to-end discovery behaviour against scripted providers.

mod common;

use common::*;
use evidence::testing::{MockCompleter, MockFailure};
use research_core::domains::research::{EventKind, JobPhase, ProgressEvent, ResearchSettings};

fn evaluations(events: &[ProgressEvent]) -> Vec<&ProgressEvent> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::EvaluationComplete)
        .collect()
}

#[tokio::test]
async fn passing_first_round_stops_discovery() {
    let harness = TestHarness::new(searcher(), passing_completer());

    let job_id = harness.submit(COMPANY).await;
    let job = harness.wait_for_terminal(job_id).await;

    assert_eq!(job.phase, JobPhase::Completed);
    assert_eq!(job.discovery_iterations, 1);
    assert_eq!(job.competitors.len(), 5);
    assert!(!job.degraded, "warnings: {:?}", job.warnings);

    let evaluation = job.evaluation.expect("evaluation recorded");
    assert!(evaluation.pass);
    assert!(evaluation.overall >= 0.8, "overall {}", evaluation.overall);
    assert!(evaluation.issues.is_empty(), "issues: {:?}", evaluation.issues);

    let events = harness.events(job_id).await;
    let rounds = evaluations(&events);
    assert_eq!(rounds.len(), 1);
    assert_eq!(rounds[0].payload["strategy"], "broad");
    assert_eq!(job.report.as_deref(), Some(REPORT));
}

#[tokio::test]
async fn default_scoring_passes_on_rated_relevance() {
    let completer = scripted(
        MockCompleter::new().with_response(
            "TASK: relevance-assessment",
            relevance_json(FIVE_COMPETITORS, 0.85),
        ),
        &[("broad", FIVE_COMPETITORS)],
    );
    let harness = TestHarness::with_default_similarity(searcher(), completer);

    let job_id = harness.submit(COMPANY).await;
    let job = harness.wait_for_terminal(job_id).await;

    assert_eq!(job.phase, JobPhase::Completed);
    assert_eq!(job.discovery_iterations, 1);
    assert!(!job.degraded, "warnings: {:?}", job.warnings);

    let evaluation = job.evaluation.expect("evaluation recorded");
    assert!(evaluation.pass);
    assert!((evaluation.scores.relevance - 0.85).abs() < 1e-4);
    assert!(evaluation.overall >= 0.8, "overall {}", evaluation.overall);
    assert!(job.competitors.iter().all(|c| (c.similarity - 0.85).abs() < 1e-4));

    // Names are rated once and reused by later rounds
    assert_eq!(
        harness
            .completer
            .prompt_count_matching("TASK: relevance-assessment"),
        1
    );
}

#[tokio::test]
async fn unrated_candidates_fall_back_to_lexical_similarity() {
    let harness = TestHarness::with_default_similarity(searcher(), passing_completer());

    let job_id = harness.submit(COMPANY).await;
    let job = harness.wait_for_terminal(job_id).await;

    // The lexical fallback is too weak to clear the relevance bar alone
    assert_eq!(job.phase, JobPhase::Completed);
    assert_eq!(job.discovery_iterations, 3);
    assert!(job.degraded);
    let evaluation = job.evaluation.expect("evaluation recorded");
    assert!(!evaluation.pass);
    assert!(evaluation.scores.relevance < 0.6);
    assert_eq!(job.competitors.len(), 5);
}

#[tokio::test]
async fn thin_first_round_switches_strategy() {
    let completer = completer(&[
        ("broad", &["Beta Insights", "Gamma Metrics"]),
        (
            "platform/community",
            &["Delta Dashboards", "Epsilon Data", "Zeta Labs"],
        ),
    ]);
    let harness = TestHarness::new(searcher(), completer);

    let job_id = harness.submit(COMPANY).await;
    let job = harness.wait_for_terminal(job_id).await;

    let events = harness.events(job_id).await;
    let rounds = evaluations(&events);
    assert_eq!(rounds.len(), 2);

    assert_eq!(rounds[0].payload["candidate_count"], 2);
    assert_eq!(rounds[0].payload["pass"], false);
    assert!((rounds[0].payload["scores"]["quantity"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    let issues = rounds[0].payload["issues"].as_array().unwrap();
    assert_eq!(issues[0], "insufficient quantity: found 2, need 4");

    assert_eq!(rounds[1].payload["strategy"], "platform/community");
    assert_eq!(rounds[1].payload["pass"], true);

    // Earlier rounds' mentions still count
    assert_eq!(job.competitors.len(), 5);
    assert_eq!(job.discovery_iterations, 2);
    assert!(!job.degraded);
}

#[tokio::test]
async fn exhausted_iterations_continue_degraded() {
    let three: &[&str] = &["Beta Insights", "Gamma Metrics", "Delta Dashboards"];
    let completer = completer(&[
        ("broad", three),
        ("platform/community", three),
        ("niche", three),
    ]);
    let harness = TestHarness::with_settings(
        searcher(),
        completer,
        ResearchSettings::default().with_max_iterations(3),
    );

    let job_id = harness.submit(COMPANY).await;
    let job = harness.wait_for_terminal(job_id).await;

    assert_eq!(job.phase, JobPhase::Completed);
    assert_eq!(job.discovery_iterations, 3);
    assert_eq!(job.competitors.len(), 3);
    assert!(job.degraded);
    assert!(
        job.warnings
            .iter()
            .any(|w| w.contains("insufficient quantity: found 3, need 4")),
        "warnings: {:?}",
        job.warnings
    );

    let events = harness.events(job_id).await;
    let discovery_done = events
        .iter()
        .position(|e| {
            e.kind == EventKind::PhaseComplete && e.phase == JobPhase::DiscoveringCompetitors
        })
        .expect("discovery completes");
    assert_eq!(events[discovery_done].payload["degraded"], true);

    let next_started = events[discovery_done + 1..]
        .iter()
        .find(|e| e.kind == EventKind::PhaseStarted)
        .expect("another phase starts");
    assert_eq!(next_started.phase, JobPhase::Enriching);
}

#[tokio::test]
async fn failing_queries_are_retried_then_skipped() {
    let searcher = searcher()
        .failing("companies similar to Acme Analytics", MockFailure::Transient)
        .failing("Acme Analytics alternatives", MockFailure::Transient);
    let harness = TestHarness::new(searcher, passing_completer());

    let job_id = harness.submit(COMPANY).await;
    let job = harness.wait_for_terminal(job_id).await;

    // One retry each, then the round moves on
    assert_eq!(
        harness
            .searcher
            .call_count_matching("companies similar to Acme Analytics"),
        2
    );
    assert_eq!(
        harness.searcher.call_count_matching("Acme Analytics alternatives"),
        2
    );

    let events = harness.events(job_id).await;
    let rounds = evaluations(&events);
    assert_eq!(rounds[0].payload["failed_queries"], 2);

    assert_eq!(job.phase, JobPhase::Completed);
    assert!(job.competitors.iter().all(|c| c.frequency == 3));
}

#[tokio::test]
async fn queries_are_announced_before_results() {
    let harness = TestHarness::new(searcher(), passing_completer());

    let job_id = harness.submit(COMPANY).await;
    harness.wait_for_terminal(job_id).await;

    let events = harness.events(job_id).await;
    let first_query = events
        .iter()
        .position(|e| e.kind == EventKind::QueryIssued)
        .expect("queries issued");
    let first_candidate = events
        .iter()
        .position(|e| e.kind == EventKind::CandidateFound)
        .expect("candidates found");
    assert!(first_query < first_candidate);

    let announced: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::CandidateFound)
        .map(|e| e.payload["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(announced.len(), 5);
}
