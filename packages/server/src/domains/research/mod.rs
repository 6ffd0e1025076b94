//! Research domain
//!
//! Competitor discovery and company research as a multi-phase job:
//! profile, discover (quality-gated rounds), optional reviewer checkpoint,
//! enrich, curate, synthesize.

pub mod activities;
pub mod events;
pub mod job_runner;
pub mod models;
pub mod orchestrator;
pub mod settings;

pub use events::{EventKind, ProgressEvent, ProgressUpdate};
pub use models::*;
pub use orchestrator::ResearchOrchestrator;
pub use settings::*;
