//! Tunables for the research engine.
//!
//! Every struct has a `Default` matching production behaviour; tests and
//! `Config` override individual fields through the `with_*` methods.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub max_iterations: u32,
    /// Clamped to 3..=5.
    pub queries_per_round: usize,
    pub results_per_query: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            queries_per_round: 5,
            results_per_query: 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankerSettings {
    pub frequency_weight: f32,
    pub similarity_weight: f32,
    pub confidence_weight: f32,
    pub max_candidates: usize,
    /// Extra names rejected on top of the built-in generic-word list.
    pub denylist: Vec<String>,
}

impl Default for RankerSettings {
    fn default() -> Self {
        Self {
            frequency_weight: 1.0,
            similarity_weight: 1.0,
            confidence_weight: 1.0,
            max_candidates: 15,
            denylist: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QualityThresholds {
    pub min_candidates: usize,
    pub min_overall: f32,
    pub min_relevance: f32,
    /// Candidates averaged for the relevance dimension.
    pub relevance_top_k: usize,
    /// Weights of the overall score, normalized by their sum.
    pub relevance_weight: f32,
    pub quantity_weight: f32,
    pub confidence_weight: f32,
    pub diversity_weight: f32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_candidates: 4,
            min_overall: 0.7,
            min_relevance: 0.6,
            relevance_top_k: 5,
            relevance_weight: 0.4,
            quantity_weight: 0.25,
            confidence_weight: 0.2,
            diversity_weight: 0.15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CuratorSettings {
    pub relevance_threshold: f32,
    pub max_per_category: usize,
}

impl Default for CuratorSettings {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.4,
            max_per_category: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    /// Competitors that get their own evidence query.
    pub max_competitors: usize,
    pub results_per_query: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            max_competitors: 8,
            results_per_query: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResearchSettings {
    pub discovery: DiscoverySettings,
    pub ranker: RankerSettings,
    pub quality: QualityThresholds,
    pub curator: CuratorSettings,
    pub enrichment: EnrichmentSettings,
    /// Pause for a reviewer after discovery.
    pub human_review: bool,
    /// `None` waits forever.
    pub checkpoint_timeout: Option<Duration>,
}

impl ResearchSettings {
    pub fn with_human_review(mut self, enabled: bool) -> Self {
        self.human_review = enabled;
        self
    }

    pub fn with_checkpoint_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.checkpoint_timeout = timeout;
        self
    }

    pub fn with_max_iterations(mut self, iterations: u32) -> Self {
        self.discovery.max_iterations = iterations;
        self
    }

    pub fn with_quality(mut self, quality: QualityThresholds) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_curator(mut self, curator: CuratorSettings) -> Self {
        self.curator = curator;
        self
    }
}
