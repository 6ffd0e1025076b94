//! In-process test harness.
//!
//! Wires an orchestrator to mock providers behind a real gateway, so tests
//! exercise rate limiting, retries and the event bus without network calls.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use evidence::testing::{MockCompleter, MockWebSearcher};
use evidence::{CapabilityLimits, EvidenceGateway, RetryPolicy};
use research_core::domains::research::activities::{LexicalSimilarity, SimilarityScorer};
use research_core::domains::research::{
    CompetitorCandidate, Job, JobId, JobPhase, ProgressEvent, ResearchOrchestrator,
    ResearchRequest, ResearchSettings,
};
use research_core::kernel::{ProgressBus, ResearchDeps};
use research_core::server::build_app;

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize tracing once. Run tests with: RUST_LOG=debug cargo test -- --nocapture
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Same similarity for every pair, so rankings depend only on the mentions.
pub struct FixedSimilarity(pub f32);

impl SimilarityScorer for FixedSimilarity {
    fn similarity(&self, _candidate: &CompetitorCandidate, _profile: &str) -> f32 {
        self.0
    }
}

/// Panics whenever the profile side mentions `EXPLODE`.
pub struct ExplodingSimilarity;

impl SimilarityScorer for ExplodingSimilarity {
    fn similarity(&self, _candidate: &CompetitorCandidate, profile: &str) -> f32 {
        if profile.contains("EXPLODE") {
            panic!("similarity scorer exploded");
        }
        0.9
    }
}

pub struct TestHarness {
    pub orchestrator: ResearchOrchestrator,
    pub searcher: Arc<MockWebSearcher>,
    pub completer: Arc<MockCompleter>,
}

impl TestHarness {
    pub fn new(searcher: MockWebSearcher, completer: MockCompleter) -> Self {
        Self::with_settings(searcher, completer, ResearchSettings::default())
    }

    pub fn with_settings(
        searcher: MockWebSearcher,
        completer: MockCompleter,
        settings: ResearchSettings,
    ) -> Self {
        Self::build(
            searcher,
            completer,
            settings,
            ProgressBus::new(),
            Arc::new(FixedSimilarity(0.9)),
        )
    }

    /// Production scoring: completion-rated relevance with the lexical
    /// fallback `ResearchDeps::in_memory` installs.
    pub fn with_default_similarity(searcher: MockWebSearcher, completer: MockCompleter) -> Self {
        Self::build(
            searcher,
            completer,
            ResearchSettings::default(),
            ProgressBus::new(),
            Arc::new(LexicalSimilarity::new()),
        )
    }

    pub fn build(
        searcher: MockWebSearcher,
        completer: MockCompleter,
        settings: ResearchSettings,
        bus: ProgressBus,
        similarity: Arc<dyn SimilarityScorer>,
    ) -> Self {
        init_tracing();

        let searcher = Arc::new(searcher);
        let completer = Arc::new(completer);
        let gateway = EvidenceGateway::builder(searcher.clone(), completer.clone())
            .search_limits(CapabilityLimits::new(10, 1000))
            .completion_limits(CapabilityLimits::new(10, 1000))
            .retry(RetryPolicy::new(2, Duration::from_millis(1)))
            .build();

        let deps = ResearchDeps::in_memory(Arc::new(gateway), settings)
            .with_bus(bus)
            .with_similarity(similarity);

        Self {
            orchestrator: ResearchOrchestrator::new(deps),
            searcher,
            completer,
        }
    }

    pub fn app(&self) -> Router {
        build_app(self.orchestrator.clone(), &[])
    }

    pub async fn submit(&self, company: &str) -> JobId {
        self.orchestrator
            .submit(ResearchRequest::builder().company(company).build())
            .await
            .expect("submit should succeed")
    }

    /// Poll the job until `done` holds, panicking after a timeout.
    pub async fn wait_until(&self, job_id: JobId, done: impl Fn(&Job) -> bool) -> Job {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        loop {
            let job = self
                .orchestrator
                .get_snapshot(job_id)
                .await
                .expect("job should exist");
            if done(&job) {
                return job;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("timed out waiting for job {}; last phase {}", job_id, job.phase);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_for_phase(&self, job_id: JobId, phase: JobPhase) -> Job {
        self.wait_until(job_id, |job| job.phase == phase).await
    }

    pub async fn wait_for_terminal(&self, job_id: JobId) -> Job {
        self.wait_until(job_id, |job| job.terminal).await
    }

    pub async fn events(&self, job_id: JobId) -> Vec<ProgressEvent> {
        self.orchestrator.deps().bus.history(job_id).await
    }
}
