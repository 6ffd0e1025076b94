//! In-process progress event bus with per-job replay.
//!
//! Every job gets an ordered log of sequenced events plus a broadcast channel
//! for live delivery. Subscribing replays the retained log from a requested
//! sequence and then switches to live events with no gap in between.
//!
//! # Usage
//!
//! Producers (the job's own task):
//!   bus.publish(job_id, ProgressUpdate::new(phase, EventKind::QueryIssued, "...")).await;
//!
//! Consumers (WebSocket endpoints, tests):
//!   let events = bus.subscribe(job_id, Some(42)).await?.into_stream();
//!
//! Publishing never waits on subscribers. A subscriber that falls more than
//! the channel capacity behind receives `Delivery::Lagged` and its stream
//! ends; it must resubscribe or poll the job snapshot.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::domains::research::events::{ProgressEvent, ProgressUpdate};
use crate::domains::research::models::JobId;
use crate::error::{ResearchError, Result};

/// Item yielded to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Event(ProgressEvent),
    /// The subscriber fell behind; no more events follow.
    Lagged { missed: u64 },
}

struct JobLog {
    events: VecDeque<ProgressEvent>,
    next_sequence: u64,
    sender: broadcast::Sender<ProgressEvent>,
}

impl JobLog {
    fn new(buffer: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_sequence: 1,
            sender: broadcast::channel(buffer).0,
        }
    }

    fn oldest_retained(&self) -> u64 {
        self.events
            .front()
            .map(|e| e.sequence)
            .unwrap_or(self.next_sequence)
    }
}

/// Replay-then-live view of one job's events.
pub struct Subscription {
    replay: Vec<ProgressEvent>,
    receiver: broadcast::Receiver<ProgressEvent>,
}

impl Subscription {
    /// Sequence of the last replayed event, if any.
    pub fn replayed_through(&self) -> Option<u64> {
        self.replay.last().map(|e| e.sequence)
    }

    pub fn into_stream(self) -> impl Stream<Item = Delivery> + Send + Unpin {
        let replay = stream::iter(self.replay.into_iter().map(Delivery::Event));

        let live = BroadcastStream::new(self.receiver)
            .map(|item| match item {
                Ok(event) => Delivery::Event(event),
                Err(BroadcastStreamRecvError::Lagged(missed)) => Delivery::Lagged { missed },
            })
            .scan(false, |lagged, delivery| {
                if *lagged {
                    return futures::future::ready(None);
                }
                *lagged = matches!(delivery, Delivery::Lagged { .. });
                futures::future::ready(Some(delivery))
            });

        Box::pin(replay.chain(live))
    }
}

/// Per-job ordered event logs. Cloneable, shared by all jobs.
#[derive(Clone)]
pub struct ProgressBus {
    logs: Arc<RwLock<HashMap<JobId, Arc<Mutex<JobLog>>>>>,
    retention: usize,
    subscriber_buffer: usize,
}

impl ProgressBus {
    /// Default: 1024 retained events per job, 256 buffered per subscriber.
    pub fn new() -> Self {
        Self::with_limits(1024, 256)
    }

    pub fn with_limits(retention: usize, subscriber_buffer: usize) -> Self {
        Self {
            logs: Arc::new(RwLock::new(HashMap::new())),
            retention: retention.max(1),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    async fn log_for(&self, job_id: JobId) -> Arc<Mutex<JobLog>> {
        if let Some(log) = self.logs.read().await.get(&job_id) {
            return log.clone();
        }
        let mut logs = self.logs.write().await;
        logs.entry(job_id)
            .or_insert_with(|| Arc::new(Mutex::new(JobLog::new(self.subscriber_buffer))))
            .clone()
    }

    /// Assign the next sequence number, append to the log, fan out.
    pub async fn publish(&self, job_id: JobId, update: ProgressUpdate) -> ProgressEvent {
        let log = self.log_for(job_id).await;
        let mut log = log.lock().await;

        let event = update.sequenced(job_id, log.next_sequence);
        log.next_sequence += 1;

        log.events.push_back(event.clone());
        while log.events.len() > self.retention {
            log.events.pop_front();
        }

        // No receivers is fine
        let _ = log.sender.send(event.clone());
        event
    }

    /// Replay retained events with `sequence >= from_sequence`, then go live.
    ///
    /// `None` replays everything still retained. Requesting a sequence that
    /// has already been evicted fails with `SequenceEvicted`.
    pub async fn subscribe(&self, job_id: JobId, from_sequence: Option<u64>) -> Result<Subscription> {
        let log = self.log_for(job_id).await;
        let log = log.lock().await;

        let oldest = log.oldest_retained();
        let from = from_sequence.unwrap_or(oldest);
        if from < oldest && oldest > 1 {
            return Err(ResearchError::SequenceEvicted {
                requested: from,
                oldest,
            });
        }

        // Subscribing under the lock means nothing published after the
        // replay snapshot can be missed.
        let receiver = log.sender.subscribe();
        let replay = log
            .events
            .iter()
            .filter(|e| e.sequence >= from)
            .cloned()
            .collect();

        Ok(Subscription { replay, receiver })
    }

    /// Retained events for a job, oldest first.
    pub async fn history(&self, job_id: JobId) -> Vec<ProgressEvent> {
        match self.logs.read().await.get(&job_id) {
            Some(log) => log.lock().await.events.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Drop a job's log. Live subscribers see their stream end.
    pub async fn remove(&self, job_id: JobId) {
        self.logs.write().await.remove(&job_id);
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}
