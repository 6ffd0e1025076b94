// Main entry point for the research API server

use std::sync::Arc;

use anyhow::{Context, Result};
use evidence::{EvidenceGateway, ExposeSecret, OpenAiCompleter, TavilyWebSearcher};
use research_core::{
    domains::research::ResearchOrchestrator,
    kernel::{ProgressBus, ResearchDeps},
    server::build_app,
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,research_core=debug,evidence=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting competitive research API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        model = %config.openai_model,
        human_review = config.human_review,
        "Configuration loaded"
    );

    // Providers behind the rate-limited gateway
    let searcher = TavilyWebSearcher::new(config.tavily_api_key.expose_secret().to_owned());
    let mut completer = OpenAiCompleter::new(
        config.openai_api_key.expose_secret().to_owned(),
        config.openai_model.clone(),
    );
    if let Some(base_url) = &config.openai_base_url {
        completer = completer.with_base_url(base_url.clone());
    }
    let gateway = EvidenceGateway::builder(Arc::new(searcher), Arc::new(completer))
        .search_limits(config.search_limits())
        .completion_limits(config.completion_limits())
        .retry(config.retry_policy())
        .build();

    let deps = ResearchDeps::in_memory(Arc::new(gateway), config.research_settings()).with_bus(
        ProgressBus::with_limits(config.event_log_retention, config.subscriber_buffer),
    );
    let orchestrator = ResearchOrchestrator::new(deps);

    // Build application
    let app = build_app(orchestrator, &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
