use axum::{extract::Extension, http::StatusCode, Json};
use evidence::GatewayStatus;
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    active_jobs: usize,
    gateway: GatewayStatus,
}

/// Health check endpoint
///
/// Reports running jobs and the evidence gateway's lanes. Returns 503 while
/// a provider's quota is exhausted, since new jobs would be rejected.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let gateway = state.orchestrator.deps().gateway.status();
    let exhausted = state.orchestrator.deps().gateway.is_exhausted();

    let (status_code, status) = if exhausted {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            active_jobs: state.orchestrator.active_jobs(),
            gateway,
        }),
    )
}
