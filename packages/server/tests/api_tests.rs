//! HTTP surface, driven in-process with `tower::ServiceExt::oneshot`.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use common::*;
use evidence::testing::{MockCompleter, MockFailure};
use evidence::CancellationToken;
use research_core::domains::research::{JobId, JobPhase, ResearchSettings};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn submit(app: &Router) -> JobId {
    let (status, body) = send(
        app,
        Method::POST,
        "/research",
        Some(json!({ "company": COMPANY, "user_role": "Head of Product" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    serde_json::from_value(body["job_id"].clone()).unwrap()
}

#[tokio::test]
async fn health_reports_gateway_and_jobs() {
    let harness = TestHarness::new(searcher(), passing_completer());
    let app = harness.app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_jobs"], 0);
    assert!(body["gateway"].is_object());
}

#[tokio::test]
async fn submit_validates_the_request() {
    let harness = TestHarness::new(searcher(), passing_completer());
    let app = harness.app();

    let (status, body) = send(&app, Method::POST, "/research", Some(json!({ "company": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send(&app, Method::POST, "/research", Some(json!({ "name": "Acme" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    assert!(harness.orchestrator.list_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn completed_job_lifecycle() {
    let harness = TestHarness::new(searcher(), passing_completer());
    let app = harness.app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/research",
        Some(json!({ "company": "  Acme   Analytics ", "user_role": "Head of Product" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "accepted");
    let job_id: JobId = serde_json::from_value(body["job_id"].clone()).unwrap();
    assert_eq!(body["websocket_url"], format!("/research/ws/{}", job_id));

    harness.wait_for_terminal(job_id).await;

    let (status, job) = send(&app, Method::GET, &format!("/research/{}", job_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["phase"], "completed");
    assert_eq!(job["company"], COMPANY);

    let (status, legacy) = send(&app, Method::GET, &format!("/research/status/{}", job_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(legacy["id"], job["id"]);

    let (status, report) = send(&app, Method::GET, &format!("/research/{}/report", job_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["report"], REPORT);
    assert_eq!(report["degraded"], false);

    // The role reaches the report prompt
    assert_eq!(
        harness
            .completer
            .prompt_count_matching("Prepared for: Head of Product"),
        1
    );
    // and tailors enrichment
    assert_eq!(
        harness
            .searcher
            .call_count_matching("Acme Analytics product roadmap new features"),
        1
    );
    assert_eq!(
        harness
            .searcher
            .call_count_matching("retailers industry trends"),
        1
    );

    let (status, jobs) = send(&app, Method::GET, "/research", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::POST, &format!("/research/{}/cancel", job_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let (status, _) = send(&app, Method::DELETE, &format!("/research/{}", job_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &format!("/research/{}", job_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn checkpoint_is_resumed_over_http() {
    let harness = TestHarness::with_settings(
        searcher(),
        passing_completer(),
        ResearchSettings::default().with_human_review(true),
    );
    let app = harness.app();

    let job_id = submit(&app).await;
    harness
        .wait_for_phase(job_id, JobPhase::AwaitingCheckpoint)
        .await;

    let (status, body) = send(&app, Method::GET, &format!("/research/{}/report", job_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "report_not_ready");

    let (status, body) = send(&app, Method::DELETE, &format!("/research/{}", job_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let (status, body) = send(
        &app,
        Method::POST,
        "/research/competitors/modify",
        Some(json!({
            "job_id": job_id,
            "competitors": ["Beta Insights", { "name": "Omega Analytics", "category": "indirect" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["competitor_count"], 2);

    let job = harness.wait_for_terminal(job_id).await;
    assert_eq!(job.phase, JobPhase::Completed);
    assert_eq!(job.competitors.len(), 2);
}

#[tokio::test]
async fn unknown_jobs_are_not_found() {
    let harness = TestHarness::new(searcher(), passing_completer());
    let app = harness.app();
    let missing = JobId::new();

    let (status, _) = send(&app, Method::GET, &format!("/research/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, &format!("/research/{}/cancel", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/research/competitors/modify",
        Some(json!({ "job_id": missing, "competitors": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn running_job_can_be_cancelled() {
    let harness = TestHarness::with_settings(
        searcher(),
        passing_completer(),
        ResearchSettings::default().with_human_review(true),
    );
    let app = harness.app();

    let job_id = submit(&app).await;
    harness
        .wait_for_phase(job_id, JobPhase::AwaitingCheckpoint)
        .await;

    let (status, body) = send(&app, Method::POST, &format!("/research/{}/cancel", job_id), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "cancelling");

    let job = harness.wait_for_terminal(job_id).await;
    assert_eq!(job.phase, JobPhase::Failed);
    assert_eq!(job.failure_reason.as_deref(), Some("cancelled"));
}

#[tokio::test]
async fn failed_report_completes_with_fallback() {
    let completer = scripted(
        MockCompleter::new().failing("TASK: executive-report", MockFailure::Permanent),
        &[("broad", FIVE_COMPETITORS)],
    );
    let searcher = searcher().failing("revenue funding financials", MockFailure::Permanent);
    let harness = TestHarness::new(searcher, completer);
    let app = harness.app();

    let job_id = submit(&app).await;
    let job = harness.wait_for_terminal(job_id).await;
    assert_eq!(job.phase, JobPhase::Completed);
    assert!(job.degraded);
    assert!(job.warnings.iter().any(|w| w.starts_with("synthesis failed")));

    let (status, report) = send(&app, Method::GET, &format!("/research/{}/report", job_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["degraded"], true);

    let text = report["report"].as_str().unwrap();
    assert!(text.starts_with("# Acme Analytics Research Report"));
    assert!(text.contains("- Beta Insights (direct)"));
    assert!(text.contains("## Note"));
    assert!(!text.contains("## Financial Position"));

    // Only sections the fallback actually wrote are listed
    assert_eq!(
        report["degraded_sections"],
        json!([
            "company",
            "industry",
            "sector_trends",
            "client_trends",
            "news",
            "competitor"
        ])
    );
}

#[tokio::test]
async fn exhausted_quota_rejects_submissions() {
    let harness = TestHarness::new(
        searcher().failing("plan limit", MockFailure::QuotaExhausted),
        passing_completer(),
    );
    let app = harness.app();

    let gateway = &harness.orchestrator.deps().gateway;
    let err = gateway
        .search("plan limit", 5, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.exhausts_capacity());

    let (status, body) = send(&app, Method::POST, "/research", Some(json!({ "company": COMPANY }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "capacity_exhausted");

    let (status, health) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "degraded");

    assert!(harness.orchestrator.list_jobs().await.unwrap().is_empty());
}
