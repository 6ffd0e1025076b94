//! Job orchestrator
//!
//! Accepts research requests, spawns one runner task per job, and is the
//! only way callers interact with a live job: resume a checkpoint, cancel,
//! read snapshots, subscribe to progress, evict finished jobs.
//!
//! Each runner is watched by a supervisor task. A panic inside one job marks
//! that job `Failed` and leaves every other job alone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::activities::ranker::{clean_name, dedupe_candidates, name_key};
use super::events::{EventKind, ProgressUpdate};
use super::job_runner::{CheckpointSlot, JobRunner};
use super::models::{
    CompetitorCandidate, CompetitorEdit, Job, JobId, JobPhase, ResearchRequest,
};
use crate::error::{ResearchError, Result};
use crate::kernel::{ResearchDeps, Subscription};

struct ActiveJob {
    cancel: CancellationToken,
    checkpoint: CheckpointSlot,
}

#[derive(Clone)]
pub struct ResearchOrchestrator {
    deps: Arc<ResearchDeps>,
    active: Arc<Mutex<HashMap<JobId, ActiveJob>>>,
}

impl ResearchOrchestrator {
    pub fn new(deps: ResearchDeps) -> Self {
        Self {
            deps: Arc::new(deps),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn deps(&self) -> &Arc<ResearchDeps> {
        &self.deps
    }

    /// Jobs whose runner task has not finished yet.
    pub fn active_jobs(&self) -> usize {
        self.lock_active().len()
    }

    fn lock_active(&self) -> MutexGuard<'_, HashMap<JobId, ActiveJob>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a job in `Submitted` and start it in the background.
    pub async fn submit(&self, request: ResearchRequest) -> Result<JobId> {
        let request = request.normalized()?;
        if self.deps.gateway.is_exhausted() {
            return Err(ResearchError::CapacityExhausted);
        }

        let job = Job::from_request(request);
        let job_id = job.id;
        self.deps.store.put(job.clone()).await?;

        let cancel = CancellationToken::new();
        let checkpoint = CheckpointSlot::default();
        self.lock_active().insert(
            job_id,
            ActiveJob {
                cancel: cancel.clone(),
                checkpoint: checkpoint.clone(),
            },
        );

        info!(job_id = %job_id, company = %job.company, "Research job submitted");

        let runner = JobRunner::new(self.deps.clone(), job, cancel, checkpoint);
        let handle = tokio::spawn(runner.run());

        let deps = self.deps.clone();
        let active = self.active.clone();
        tokio::spawn(async move {
            let outcome = handle.await;
            active
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&job_id);
            if let Err(join_error) = outcome {
                fail_crashed_job(&deps, job_id, join_error).await;
            }
        });

        Ok(job_id)
    }

    /// Replace the candidate list and let a paused job continue.
    ///
    /// Only valid while the job is `AwaitingCheckpoint`; otherwise nothing
    /// changes. Returns the number of competitors the job continues with.
    pub async fn resume_with_competitors(
        &self,
        job_id: JobId,
        edits: Vec<CompetitorEdit>,
    ) -> Result<usize> {
        let job = self.get_snapshot(job_id).await?;
        if job.phase != JobPhase::AwaitingCheckpoint {
            return Err(ResearchError::invalid_transition(job_id, job.phase, "resume"));
        }

        let candidates = apply_edits(&job.competitors, edits)?;
        let count = candidates.len();

        let slot = self
            .lock_active()
            .get(&job_id)
            .map(|active| active.checkpoint.clone());
        let sender = slot.and_then(|slot| {
            slot.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
        });
        let Some(sender) = sender else {
            return Err(ResearchError::invalid_transition(job_id, job.phase, "resume"));
        };
        if sender.send(candidates).is_err() {
            return Err(ResearchError::invalid_transition(job_id, job.phase, "resume"));
        }

        info!(job_id = %job_id, competitors = count, "Checkpoint resumed");
        Ok(count)
    }

    /// Latest persisted snapshot. Never waits on the running job.
    pub async fn get_snapshot(&self, job_id: JobId) -> Result<Job> {
        self.deps
            .store
            .get(job_id)
            .await?
            .ok_or(ResearchError::NotFound(job_id))
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        self.deps.store.list().await
    }

    /// Ask a live job to stop at its next suspension point.
    pub async fn cancel(&self, job_id: JobId) -> Result<()> {
        let job = self.get_snapshot(job_id).await?;
        if job.terminal {
            return Err(ResearchError::invalid_transition(job_id, job.phase, "cancel"));
        }

        let token = self
            .lock_active()
            .get(&job_id)
            .map(|active| active.cancel.clone());
        match token {
            Some(token) => {
                info!(job_id = %job_id, phase = %job.phase, "Cancelling research job");
                token.cancel();
                Ok(())
            }
            None => Err(ResearchError::invalid_transition(job_id, job.phase, "cancel")),
        }
    }

    /// Drop a finished job's snapshot and event log.
    pub async fn evict(&self, job_id: JobId) -> Result<()> {
        let job = self.get_snapshot(job_id).await?;
        if !job.terminal {
            return Err(ResearchError::invalid_transition(job_id, job.phase, "evict"));
        }
        self.deps.store.remove(job_id).await?;
        self.deps.bus.remove(job_id).await;
        info!(job_id = %job_id, "Research job evicted");
        Ok(())
    }

    /// Replay from `from_sequence` (everything retained when `None`), then live.
    pub async fn subscribe(&self, job_id: JobId, from_sequence: Option<u64>) -> Result<Subscription> {
        self.get_snapshot(job_id).await?;
        self.deps.bus.subscribe(job_id, from_sequence).await
    }
}

/// Merge reviewer edits with the discovered candidates.
///
/// Names matching a discovered candidate keep its evidence; new names become
/// manual candidates. Blank names are rejected.
fn apply_edits(
    discovered: &[CompetitorCandidate],
    edits: Vec<CompetitorEdit>,
) -> Result<Vec<CompetitorCandidate>> {
    let by_key: HashMap<String, &CompetitorCandidate> =
        discovered.iter().map(|c| (name_key(&c.name), c)).collect();

    let mut candidates = Vec::with_capacity(edits.len());
    for (index, edit) in edits.into_iter().enumerate() {
        let name = clean_name(edit.name()).ok_or_else(|| {
            ResearchError::Validation(format!("competitor {} has a blank name", index + 1))
        })?;

        let mut candidate = by_key
            .get(&name_key(&name))
            .map(|existing| (*existing).clone())
            .unwrap_or_else(|| CompetitorCandidate::manual(name));

        if let CompetitorEdit::Detailed {
            category,
            description,
            ..
        } = edit
        {
            if let Some(category) = category {
                candidate.category = category;
            }
            if description.is_some() {
                candidate.description = description;
            }
        }
        candidates.push(candidate);
    }

    Ok(dedupe_candidates(candidates))
}

async fn fail_crashed_job(deps: &ResearchDeps, job_id: JobId, join_error: JoinError) {
    error!(job_id = %job_id, error = %join_error, "Research job task crashed");

    let mut job = match deps.store.get(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => return,
        Err(store_error) => {
            error!(job_id = %job_id, error = %store_error, "Could not load crashed job");
            return;
        }
    };
    if job.terminal {
        return;
    }

    let failed_phase = job.phase;
    job.mark_failed(
        "internal error",
        json!({ "error": join_error.to_string(), "failed_phase": failed_phase }),
    );
    if let Err(store_error) = deps.store.put(job).await {
        error!(job_id = %job_id, error = %store_error, "Could not persist crashed job");
    }
    deps.bus
        .publish(
            job_id,
            ProgressUpdate::new(JobPhase::Failed, EventKind::JobFailed, "Research failed: internal error")
                .with_payload(json!({ "reason": "internal error", "failed_phase": failed_phase })),
        )
        .await;
}
