//! Error taxonomy for the research engine.
//!
//! Leaf components return typed results; only the variants below ever cross
//! the orchestrator boundary or reach an HTTP handler.

use std::time::Duration;

use evidence::EvidenceError;
use thiserror::Error;

use crate::domains::research::models::{JobId, JobPhase};

#[derive(Debug, Error)]
pub enum ResearchError {
    /// Caller supplied unusable input
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation not allowed in the job's current phase
    #[error("cannot {action} job {job_id} while {phase}")]
    InvalidTransition {
        job_id: JobId,
        phase: JobPhase,
        action: &'static str,
    },

    #[error("job not found: {0}")]
    NotFound(JobId),

    /// Reviewer never answered the checkpoint
    #[error("checkpoint timed out after {}s", .0.as_secs())]
    CheckpointTimeout(Duration),

    /// Final report could not be produced
    #[error("synthesis failed: {0}")]
    SynthesisFailure(String),

    /// Gateway is cooling down after provider quota exhaustion
    #[error("evidence capacity exhausted")]
    CapacityExhausted,

    #[error("job cancelled")]
    Cancelled,

    /// Replay requested from a sequence that is no longer retained
    #[error("event sequence {requested} is no longer retained (oldest is {oldest})")]
    SequenceEvicted { requested: u64, oldest: u64 },

    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    /// Broken internal state inside a job task
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResearchError {
    pub fn invalid_transition(job_id: JobId, phase: JobPhase, action: &'static str) -> Self {
        Self::InvalidTransition {
            job_id,
            phase,
            action,
        }
    }

    /// Human-readable failure reason stored on a failed job.
    pub fn failure_reason(&self) -> String {
        match self {
            Self::Cancelled | Self::Evidence(EvidenceError::Cancelled) => "cancelled".to_string(),
            other => other.to_string(),
        }
    }

    /// The job-level error a provider failure escalates to, if any.
    ///
    /// Most provider failures only degrade the phase that saw them;
    /// cancellation and exhausted capacity end the job.
    pub fn escalate(error: &EvidenceError) -> Option<Self> {
        match error {
            EvidenceError::Cancelled => Some(Self::Cancelled),
            EvidenceError::CapacityExhausted { .. } | EvidenceError::QuotaExhausted { .. } => {
                Some(Self::CapacityExhausted)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResearchError>;
