//! Quality evaluation of a candidate set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionScores {
    pub quantity: f32,
    pub relevance: f32,
    pub diversity: f32,
    pub confidence: f32,
}

/// Verdict on one discovery round. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub iteration: u32,
    pub candidate_count: usize,
    pub overall: f32,
    pub scores: DimensionScores,
    pub pass: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}
