//! Research activities
//!
//! Business logic for each phase of a research job:
//! - `profile`: company profile from search evidence plus one completion
//! - `discovery`: quality-gated competitor discovery rounds
//! - `relevance`: completion-rated candidate relevance for discovery
//! - `enrich`: category-tagged evidence queries after discovery
//! - `role_focus`: requester role to focus topics and extra queries
//! - `curator`: dedupe, filter and cap documents per category
//! - `synthesis`: section briefs, final report, fallback report
//!
//! Pure helpers (`ranker`, `evaluator`, `query_strategy`, `similarity`) have
//! no I/O and are tested in isolation.

pub mod context;
pub mod curator;
pub mod discovery;
pub mod enrich;
pub mod evaluator;
pub mod extract_mentions;
pub mod profile;
pub mod query_strategy;
pub mod ranker;
pub mod relevance;
pub mod role_focus;
pub mod search;
pub mod similarity;
pub mod synthesis;

pub use context::PhaseContext;
pub use curator::{curate, curate_documents, normalize_url, CurationOutcome, Verdict};
pub use discovery::run_discovery;
pub use enrich::enrich;
pub use evaluator::evaluate;
pub use profile::build_profile;
pub use query_strategy::QueryStrategy;
pub use ranker::{candidate_pool, dedupe_candidates, name_key, rank_candidates};
pub use relevance::{RatedSimilarity, RelevanceRatings};
pub use role_focus::RoleFocus;
pub use similarity::{LexicalSimilarity, SimilarityScorer};
pub use synthesis::{fallback_report, fallback_sections, write_briefs, write_report};
