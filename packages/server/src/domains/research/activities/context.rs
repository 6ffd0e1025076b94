//! Per-phase handle passed to every research activity.

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::domains::research::events::{EventKind, ProgressEvent, ProgressUpdate};
use crate::domains::research::models::{JobId, JobPhase};
use crate::domains::research::settings::ResearchSettings;
use crate::error::{ResearchError, Result};
use crate::kernel::ResearchDeps;

/// Everything an activity needs: dependencies, the job it works for, the
/// phase its events are tagged with, and the job's cancellation token.
#[derive(Clone, Copy)]
pub struct PhaseContext<'a> {
    pub deps: &'a ResearchDeps,
    pub job_id: JobId,
    pub phase: JobPhase,
    pub cancel: &'a CancellationToken,
}

impl<'a> PhaseContext<'a> {
    pub fn new(
        deps: &'a ResearchDeps,
        job_id: JobId,
        phase: JobPhase,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            deps,
            job_id,
            phase,
            cancel,
        }
    }

    pub fn settings(&self) -> &'a ResearchSettings {
        &self.deps.settings
    }

    pub async fn emit(
        &self,
        kind: EventKind,
        message: impl Into<String>,
        payload: Value,
    ) -> ProgressEvent {
        self.deps
            .bus
            .publish(
                self.job_id,
                ProgressUpdate::new(self.phase, kind, message).with_payload(payload),
            )
            .await
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(ResearchError::Cancelled)
        } else {
            Ok(())
        }
    }
}
