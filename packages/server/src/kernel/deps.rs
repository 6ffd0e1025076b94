//! Dependency container shared by every research job.
//!
//! External capabilities sit behind traits so tests can swap in mocks.

use std::sync::Arc;

use evidence::EvidenceGateway;

use crate::domains::research::activities::similarity::{LexicalSimilarity, SimilarityScorer};
use crate::domains::research::settings::ResearchSettings;
use crate::kernel::event_bus::ProgressBus;
use crate::kernel::job_store::{InMemoryJobStore, JobStore};

#[derive(Clone)]
pub struct ResearchDeps {
    /// Rate-limited search and completion; one instance per process.
    pub gateway: Arc<EvidenceGateway>,
    pub store: Arc<dyn JobStore>,
    pub bus: ProgressBus,
    pub similarity: Arc<dyn SimilarityScorer>,
    pub settings: Arc<ResearchSettings>,
}

impl ResearchDeps {
    pub fn new(
        gateway: Arc<EvidenceGateway>,
        store: Arc<dyn JobStore>,
        bus: ProgressBus,
        similarity: Arc<dyn SimilarityScorer>,
        settings: ResearchSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            bus,
            similarity,
            settings: Arc::new(settings),
        }
    }

    /// In-memory store, default bus, lexical similarity for candidates the
    /// relevance ratings miss.
    pub fn in_memory(gateway: Arc<EvidenceGateway>, settings: ResearchSettings) -> Self {
        Self::new(
            gateway,
            Arc::new(InMemoryJobStore::new()),
            ProgressBus::new(),
            Arc::new(LexicalSimilarity::new()),
            settings,
        )
    }

    pub fn with_bus(mut self, bus: ProgressBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn SimilarityScorer>) -> Self {
        self.similarity = similarity;
        self
    }
}
