//! Research job endpoints.
//!
//! POST   /research                      submit a job
//! GET    /research                      list jobs, newest first
//! GET    /research/:job_id              job snapshot
//! GET    /research/status/:job_id       job snapshot (legacy path)
//! GET    /research/:job_id/report       final report once completed
//! POST   /research/competitors/modify   resume a checkpoint with edits
//! POST   /research/:job_id/cancel       cancel a running job
//! DELETE /research/:job_id              evict a finished job

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::domains::research::models::{CompetitorEdit, Job, JobId, JobPhase, ResearchRequest};
use crate::server::app::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    pub job_id: JobId,
    pub message: String,
    pub websocket_url: String,
}

pub async fn submit_research_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(request) = payload?;
    let company = request.company.trim().to_string();
    let job_id = state.orchestrator.submit(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            status: "accepted".to_string(),
            job_id,
            message: format!("Research started for {}", company),
            websocket_url: format!("/research/ws/{}", job_id),
        }),
    ))
}

pub async fn list_research_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<Job>>, ApiError> {
    Ok(Json(state.orchestrator.list_jobs().await?))
}

pub async fn get_research_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<JobId>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.orchestrator.get_snapshot(job_id).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub job_id: JobId,
    pub company: String,
    pub report: String,
    pub degraded: bool,
    pub degraded_sections: Vec<String>,
}

pub async fn get_report_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<JobId>,
) -> Result<Json<ReportResponse>, ApiError> {
    let job = state.orchestrator.get_snapshot(job_id).await?;
    match (job.phase, job.report) {
        (JobPhase::Completed, Some(report)) => Ok(Json(ReportResponse {
            job_id,
            company: job.company,
            report,
            degraded: job.degraded,
            degraded_sections: job.degraded_sections,
        })),
        (phase, _) => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "report_not_ready",
            format!("job {} has no report while {}", job_id, phase),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct ModifyCompetitorsRequest {
    pub job_id: JobId,
    pub competitors: Vec<CompetitorEdit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModifyCompetitorsResponse {
    pub status: String,
    pub message: String,
    pub competitor_count: usize,
}

pub async fn modify_competitors_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<ModifyCompetitorsRequest>, JsonRejection>,
) -> Result<Json<ModifyCompetitorsResponse>, ApiError> {
    let Json(request) = payload?;
    let count = state
        .orchestrator
        .resume_with_competitors(request.job_id, request.competitors)
        .await?;

    Ok(Json(ModifyCompetitorsResponse {
        status: "success".to_string(),
        message: format!("Research resumed with {} competitors", count),
        competitor_count: count,
    }))
}

pub async fn cancel_research_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<JobId>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    state.orchestrator.cancel(job_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "cancelling", "job_id": job_id })),
    ))
}

pub async fn delete_research_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<JobId>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.evict(job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
