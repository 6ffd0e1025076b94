//! Job snapshot and lifecycle phases.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use super::{CompetitorCandidate, EvaluationResult};
use crate::error::{ResearchError, Result};

/// Opaque job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle phase of a research job.
///
/// ```text
/// Submitted -> ProfilingCompany -> DiscoveringCompetitors -> [AwaitingCheckpoint]
///           -> Enriching -> Curating -> Synthesizing -> Completed
/// ```
///
/// `Failed` is reachable from every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Submitted,
    ProfilingCompany,
    DiscoveringCompetitors,
    AwaitingCheckpoint,
    Enriching,
    Curating,
    Synthesizing,
    Completed,
    Failed,
}

impl JobPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::ProfilingCompany => "profiling_company",
            Self::DiscoveringCompetitors => "discovering_competitors",
            Self::AwaitingCheckpoint => "awaiting_checkpoint",
            Self::Enriching => "enriching",
            Self::Curating => "curating",
            Self::Synthesizing => "synthesizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the state machine has an edge from `self` to `next`.
    pub fn can_transition_to(self, next: JobPhase) -> bool {
        use JobPhase::*;

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Failed)
                | (Submitted, ProfilingCompany)
                | (ProfilingCompany, DiscoveringCompetitors)
                | (DiscoveringCompetitors, AwaitingCheckpoint)
                | (DiscoveringCompetitors, Enriching)
                | (AwaitingCheckpoint, Enriching)
                | (Enriching, Curating)
                | (Curating, Synthesizing)
                | (Synthesizing, Completed)
        )
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller asks the engine to research.
#[derive(Debug, Clone, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct ResearchRequest {
    pub company: String,
    #[builder(default, setter(strip_option))]
    pub company_url: Option<String>,
    #[builder(default, setter(strip_option))]
    pub user_role: Option<String>,
}

impl ResearchRequest {
    /// Trim inputs and reject a blank company name.
    pub fn normalized(self) -> Result<Self> {
        let company = self.company.split_whitespace().collect::<Vec<_>>().join(" ");
        if company.is_empty() {
            return Err(ResearchError::Validation("company name is required".into()));
        }

        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            company,
            company_url: clean(self.company_url),
            user_role: clean(self.user_role),
        })
    }
}

/// Persisted snapshot of a research job.
///
/// Only the job's own task writes this; everyone else reads whole snapshots
/// from the job store.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default)]
    pub id: JobId,

    pub company: String,
    #[builder(default)]
    pub company_url: Option<String>,
    #[builder(default)]
    pub user_role: Option<String>,

    #[builder(default = JobPhase::Submitted)]
    pub phase: JobPhase,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
    #[builder(default)]
    pub terminal: bool,

    // Results
    #[builder(default)]
    pub report: Option<String>,
    #[builder(default)]
    pub degraded: bool,
    #[builder(default)]
    pub degraded_sections: Vec<String>,
    #[builder(default)]
    pub warnings: Vec<String>,

    // Discovery progress, exposed so reviewers can edit candidates
    #[builder(default)]
    pub competitors: Vec<CompetitorCandidate>,
    #[builder(default)]
    pub evaluation: Option<EvaluationResult>,
    #[builder(default)]
    pub discovery_iterations: u32,

    // Failure details
    #[builder(default)]
    pub failure_reason: Option<String>,
    #[builder(default)]
    pub diagnostics: Option<serde_json::Value>,
}

impl Job {
    pub fn from_request(request: ResearchRequest) -> Self {
        Self::builder()
            .company(request.company)
            .company_url(request.company_url)
            .user_role(request.user_role)
            .build()
    }

    /// Move to `next`, rejecting edges the state machine does not have.
    pub fn advance(&mut self, next: JobPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(ResearchError::invalid_transition(
                self.id,
                self.phase,
                "advance",
            ));
        }
        self.phase = next;
        self.terminal = next.is_terminal();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a degradation without failing the job.
    pub fn note_degraded(&mut self, reason: impl Into<String>) {
        self.degraded = true;
        self.warnings.push(reason.into());
        self.updated_at = Utc::now();
    }

    /// Terminal failure from any non-terminal phase.
    pub fn mark_failed(&mut self, reason: impl Into<String>, diagnostics: serde_json::Value) {
        if self.terminal {
            return;
        }
        self.phase = JobPhase::Failed;
        self.terminal = true;
        self.failure_reason = Some(reason.into());
        self.diagnostics = Some(diagnostics);
        self.updated_at = Utc::now();
    }
}
