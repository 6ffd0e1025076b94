//! The task that drives one research job from `Submitted` to a terminal phase.
//!
//! The runner is the only writer of its job's snapshot and research state.
//! Each phase follows the same shape:
//! 1. `enter`: check cancellation, advance, persist, emit `phase_started`
//! 2. run the phase's activity
//! 3. `finish`: record degradation, persist, emit `phase_complete`
//!
//! Any error ends the job in `Failed`, persisting diagnostics and a fallback
//! report built from whatever state was gathered.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::activities::{
    build_profile, curate_documents, enrich, fallback_report, fallback_sections, run_discovery,
    write_briefs, write_report, PhaseContext, RoleFocus,
};
use super::events::{EventKind, ProgressUpdate};
use super::models::{CompetitorCandidate, Job, JobPhase, ResearchState};
use crate::error::{ResearchError, Result};
use crate::kernel::ResearchDeps;

/// Where the runner parks the sender a reviewer's edits arrive through.
pub type CheckpointSlot = Arc<Mutex<Option<oneshot::Sender<Vec<CompetitorCandidate>>>>>;

pub struct JobRunner {
    deps: Arc<ResearchDeps>,
    job: Job,
    state: ResearchState,
    cancel: CancellationToken,
    checkpoint: CheckpointSlot,
}

impl JobRunner {
    pub fn new(
        deps: Arc<ResearchDeps>,
        job: Job,
        cancel: CancellationToken,
        checkpoint: CheckpointSlot,
    ) -> Self {
        Self {
            deps,
            job,
            state: ResearchState::default(),
            cancel,
            checkpoint,
        }
    }

    /// Run to a terminal phase and return the final snapshot.
    pub async fn run(mut self) -> Job {
        info!(job_id = %self.job.id, company = %self.job.company, "Research job started");

        if let Err(error) = self.drive().await {
            self.fail(error).await;
        }

        info!(
            job_id = %self.job.id,
            phase = %self.job.phase,
            degraded = self.job.degraded,
            "Research job finished"
        );
        self.job
    }

    async fn drive(&mut self) -> Result<()> {
        let deps = self.deps.clone();
        let cancel = self.cancel.clone();
        let job_id = self.job.id;

        // Profile
        self.enter(JobPhase::ProfilingCompany).await?;
        let ctx = PhaseContext::new(&deps, job_id, JobPhase::ProfilingCompany, &cancel);
        let company = self.job.company.clone();
        let company_url = self.job.company_url.clone();
        let (profile, degraded) =
            build_profile(&ctx, &company, company_url.as_deref(), &mut self.state)
                .await?
                .into_parts();
        self.state.profile = Some(profile.clone());
        self.finish(
            JobPhase::ProfilingCompany,
            degraded,
            json!({ "industry": profile.industry_label(), "documents": self.state.document_count() }),
        )
        .await?;

        // Discover
        self.enter(JobPhase::DiscoveringCompetitors).await?;
        let ctx = PhaseContext::new(&deps, job_id, JobPhase::DiscoveringCompetitors, &cancel);
        let (discovery, degraded) = run_discovery(&ctx, &profile).await?.into_parts();
        self.state.candidates = discovery.candidates.clone();
        self.job.competitors = discovery.candidates.clone();
        self.job.evaluation = Some(discovery.evaluation.clone());
        self.job.discovery_iterations = discovery.iterations;
        let payload = json!({
            "candidates": discovery.candidates.len(),
            "iterations": discovery.iterations,
            "passed": discovery.passed,
            "failed_queries": discovery.failed_queries,
        });
        self.state.discovery = Some(discovery);
        self.finish(JobPhase::DiscoveringCompetitors, degraded, payload)
            .await?;

        // Review
        if deps.settings.human_review && !self.state.candidates.is_empty() {
            let edited = self.await_checkpoint().await?;
            self.state.candidates = edited.clone();
            self.job.competitors = edited;
            self.finish(
                JobPhase::AwaitingCheckpoint,
                None,
                json!({ "candidates": self.state.candidates.len() }),
            )
            .await?;
        }

        // Enrich
        self.enter(JobPhase::Enriching).await?;
        let ctx = PhaseContext::new(&deps, job_id, JobPhase::Enriching, &cancel);
        let candidates = self.state.candidates.clone();
        let focus = RoleFocus::infer(self.job.user_role.as_deref());
        let (documents, degraded) = enrich(&ctx, &profile, &candidates, focus, &mut self.state)
            .await?
            .into_parts();
        self.finish(
            JobPhase::Enriching,
            degraded,
            json!({ "documents": documents, "role_focus": focus }),
        )
        .await?;

        // Curate
        self.enter(JobPhase::Curating).await?;
        let ctx = PhaseContext::new(&deps, job_id, JobPhase::Curating, &cancel);
        let (kept, degraded) = curate_documents(&ctx, &mut self.state)
            .await?
            .into_parts();
        self.finish(
            JobPhase::Curating,
            degraded,
            json!({ "kept": kept, "evaluated": self.state.document_count() }),
        )
        .await?;

        // Synthesize
        self.enter(JobPhase::Synthesizing).await?;
        let ctx = PhaseContext::new(&deps, job_id, JobPhase::Synthesizing, &cancel);
        let (reconstructed, degraded) = write_briefs(&ctx, &company, &mut self.state)
            .await?
            .into_parts();
        self.job.degraded_sections = reconstructed.iter().map(|c| c.as_str().to_string()).collect();

        let user_role = self.job.user_role.clone();
        let report = match write_report(&ctx, &company, user_role.as_deref(), &self.state).await {
            Ok(report) => report,
            Err(ResearchError::SynthesisFailure(reason)) => {
                warn!(job_id = %job_id, reason = %reason, "Synthesis failed, using fallback report");
                self.job.note_degraded(format!("synthesis failed: {}", reason));
                self.job.degraded_sections = fallback_sections(&self.state)
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect();
                fallback_report(&company, &self.state)
            }
            Err(other) => return Err(other),
        };
        self.state.report = Some(report.clone());
        self.job.report = Some(report);
        self.finish(
            JobPhase::Synthesizing,
            degraded,
            json!({ "briefs": self.state.briefs.len() }),
        )
        .await?;

        self.complete().await
    }

    /// Park until a reviewer resumes the job, the optional timeout fires,
    /// or the job is cancelled.
    async fn await_checkpoint(&mut self) -> Result<Vec<CompetitorCandidate>> {
        let (sender, receiver) = oneshot::channel();
        // The sender must be in place before the phase is visible to readers.
        *self
            .checkpoint
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sender);

        self.enter(JobPhase::AwaitingCheckpoint).await?;
        self.emit(
            JobPhase::AwaitingCheckpoint,
            EventKind::CheckpointRequired,
            format!(
                "Review {} competitors before enrichment",
                self.state.candidates.len()
            ),
            json!({ "competitors": self.state.candidates }),
        )
        .await;
        info!(job_id = %self.job.id, "Awaiting reviewer checkpoint");

        let timeout = self.deps.settings.checkpoint_timeout;
        let wait = async {
            let received = match timeout {
                Some(limit) => tokio::time::timeout(limit, receiver)
                    .await
                    .map_err(|_| ResearchError::CheckpointTimeout(limit))?,
                None => receiver.await,
            };
            received.map_err(|_| ResearchError::Internal("checkpoint channel closed".into()))
        };

        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => Err(ResearchError::Cancelled),
            result = wait => result,
        };
        self.clear_checkpoint();
        outcome
    }

    fn clear_checkpoint(&self) {
        self.checkpoint
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    async fn enter(&mut self, phase: JobPhase) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ResearchError::Cancelled);
        }
        self.job.advance(phase)?;
        self.persist().await?;
        self.emit(
            phase,
            EventKind::PhaseStarted,
            format!("Started {}", phase),
            Value::Null,
        )
        .await;
        Ok(())
    }

    async fn finish(
        &mut self,
        phase: JobPhase,
        degraded: Option<String>,
        payload: Value,
    ) -> Result<()> {
        let message = match &degraded {
            Some(reason) => {
                warn!(job_id = %self.job.id, phase = %phase, reason = %reason, "Phase degraded");
                format!("Completed {} (degraded: {})", phase, reason)
            }
            None => format!("Completed {}", phase),
        };
        if let Some(reason) = degraded.clone() {
            self.job.note_degraded(reason);
        }
        self.persist().await?;

        let mut payload = match payload {
            Value::Object(map) => Value::Object(map),
            _ => json!({}),
        };
        payload["degraded"] = json!(degraded.is_some());
        if let Some(reason) = degraded {
            payload["reason"] = json!(reason);
        }
        self.emit(phase, EventKind::PhaseComplete, message, payload)
            .await;
        Ok(())
    }

    async fn complete(&mut self) -> Result<()> {
        self.job.advance(JobPhase::Completed)?;
        self.persist().await?;
        self.emit(
            JobPhase::Completed,
            EventKind::JobComplete,
            format!("Research on {} complete", self.job.company),
            json!({
                "report": self.job.report,
                "degraded": self.job.degraded,
                "degraded_sections": self.job.degraded_sections,
            }),
        )
        .await;
        Ok(())
    }

    async fn fail(&mut self, failure: ResearchError) {
        self.clear_checkpoint();
        let failed_phase = self.job.phase;
        let reason = failure.failure_reason();

        if matches!(failure, ResearchError::Cancelled) {
            info!(job_id = %self.job.id, phase = %failed_phase, "Research job cancelled");
        } else {
            error!(job_id = %self.job.id, phase = %failed_phase, error = %failure, "Research job failed");
        }

        if self.job.report.is_none() && self.state.has_data() {
            self.job.report = Some(fallback_report(&self.job.company, &self.state));
            self.job.degraded = true;
        }

        let diagnostics = json!({
            "error": failure.to_string(),
            "failed_phase": failed_phase,
            "discovery_iterations": self.job.discovery_iterations,
            "candidates": self.state.candidates.len(),
            "documents": self.state.document_count(),
            "curated_documents": self.state.curated_count(),
            "has_profile": self.state.profile.is_some(),
            "warnings": self.job.warnings,
        });
        self.job.mark_failed(reason.clone(), diagnostics);

        if let Err(persist_error) = self.persist().await {
            error!(job_id = %self.job.id, error = %persist_error, "Failed to persist failed job");
        }
        self.emit(
            JobPhase::Failed,
            EventKind::JobFailed,
            format!("Research failed: {}", reason),
            json!({ "reason": reason, "failed_phase": failed_phase }),
        )
        .await;
    }

    async fn persist(&self) -> Result<()> {
        self.deps.store.put(self.job.clone()).await
    }

    async fn emit(&self, phase: JobPhase, kind: EventKind, message: String, payload: Value) {
        self.deps
            .bus
            .publish(
                self.job.id,
                ProgressUpdate::new(phase, kind, message).with_payload(payload),
            )
            .await;
    }
}
