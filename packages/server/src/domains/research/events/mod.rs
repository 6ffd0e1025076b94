//! Research progress events
//!
//! ## Events Are Facts Only
//!
//! Each event records something that already happened inside a job. Errors
//! travel as `Result::Err`; a `JobFailed` event is the fact that the job
//! ended, not the error itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domains::research::models::{JobId, JobPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PhaseStarted,
    QueryIssued,
    CandidateFound,
    EvaluationComplete,
    DocumentKept,
    DocumentDiscarded,
    CheckpointRequired,
    PhaseComplete,
    JobFailed,
    JobComplete,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PhaseStarted => "phase_started",
            Self::QueryIssued => "query_issued",
            Self::CandidateFound => "candidate_found",
            Self::EvaluationComplete => "evaluation_complete",
            Self::DocumentKept => "document_kept",
            Self::DocumentDiscarded => "document_discarded",
            Self::CheckpointRequired => "checkpoint_required",
            Self::PhaseComplete => "phase_complete",
            Self::JobFailed => "job_failed",
            Self::JobComplete => "job_complete",
        }
    }

    /// No further events follow a terminal one.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::JobFailed | Self::JobComplete)
    }
}

/// A sequenced, immutable progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    /// Strictly increasing per job, starting at 1.
    pub sequence: u64,
    pub phase: JobPhase,
    pub kind: EventKind,
    pub message: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

/// An event before the bus has assigned it a sequence number.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub phase: JobPhase,
    pub kind: EventKind,
    pub message: String,
    pub payload: Value,
}

impl ProgressUpdate {
    pub fn new(phase: JobPhase, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            phase,
            kind,
            message: message.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub(crate) fn sequenced(self, job_id: JobId, sequence: u64) -> ProgressEvent {
        ProgressEvent {
            job_id,
            sequence,
            phase: self.phase,
            kind: self.kind,
            message: self.message,
            payload: self.payload,
            timestamp: Utc::now(),
        }
    }
}
