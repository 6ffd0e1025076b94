//! Application setup and server configuration.

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domains::research::ResearchOrchestrator;
use crate::server::routes::{
    cancel_research_handler, delete_research_handler, get_report_handler, get_research_handler,
    health_handler, list_research_handler, modify_competitors_handler, research_ws_handler,
    submit_research_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ResearchOrchestrator,
}

/// Build the Axum application router
///
/// An empty `allowed_origins` allows any origin.
pub fn build_app(orchestrator: ResearchOrchestrator, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let app_state = AppState { orchestrator };

    Router::new()
        .route(
            "/research",
            post(submit_research_handler).get(list_research_handler),
        )
        .route("/research/competitors/modify", post(modify_competitors_handler))
        .route("/research/status/:job_id", get(get_research_handler))
        .route("/research/ws/:job_id", get(research_ws_handler))
        .route(
            "/research/:job_id",
            get(get_research_handler).delete(delete_research_handler),
        )
        .route("/research/:job_id/report", get(get_report_handler))
        .route("/research/:job_id/cancel", post(cancel_research_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
