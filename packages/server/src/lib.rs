// Competitive Research API - Core
//
// Runs long-lived research jobs: company profiling, iterative competitor
// discovery with quality evaluation, an optional human checkpoint, evidence
// enrichment and curation, and report synthesis. Progress streams to
// subscribers as sequenced events.
//
// Jobs are organized per-domain in domains/*/

pub mod config;
pub mod domains;
pub mod error;
pub mod kernel;
pub mod server;

pub use config::*;
