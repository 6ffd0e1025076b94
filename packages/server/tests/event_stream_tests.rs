//! Sequenced progress events: ordering, replay and lag.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use futures::StreamExt;
use research_core::domains::research::{
    EventKind, JobId, JobPhase, ProgressEvent, ResearchOrchestrator, ResearchSettings,
};
use research_core::error::ResearchError;
use research_core::kernel::{Delivery, ProgressBus};

/// Read deliveries until the job's terminal event.
async fn collect_until_terminal(
    orchestrator: &ResearchOrchestrator,
    job_id: JobId,
    from: Option<u64>,
) -> Vec<ProgressEvent> {
    let subscription = orchestrator.subscribe(job_id, from).await.unwrap();
    let mut stream = subscription.into_stream();
    let mut events = Vec::new();

    let read = async {
        while let Some(delivery) = stream.next().await {
            match delivery {
                Delivery::Event(event) => {
                    let terminal = event.kind.is_terminal();
                    events.push(event);
                    if terminal {
                        break;
                    }
                }
                Delivery::Lagged { missed } => panic!("subscriber lagged by {}", missed),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), read)
        .await
        .expect("terminal event within timeout");
    events
}

#[tokio::test]
async fn live_subscriber_sees_every_event_in_order() {
    let harness = TestHarness::new(searcher(), passing_completer());
    let job_id = harness.submit(COMPANY).await;

    let events = collect_until_terminal(&harness.orchestrator, job_id, None).await;

    let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
    let expected: Vec<u64> = (1..=events.len() as u64).collect();
    assert_eq!(sequences, expected);

    let first = &events[0];
    assert_eq!(first.kind, EventKind::PhaseStarted);
    assert_eq!(first.phase, JobPhase::ProfilingCompany);

    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::JobComplete);
    assert_eq!(last.payload["report"], REPORT);

    let started: Vec<JobPhase> = events
        .iter()
        .filter(|e| e.kind == EventKind::PhaseStarted)
        .map(|e| e.phase)
        .collect();
    assert_eq!(
        started,
        vec![
            JobPhase::ProfilingCompany,
            JobPhase::DiscoveringCompetitors,
            JobPhase::Enriching,
            JobPhase::Curating,
            JobPhase::Synthesizing,
        ]
    );
}

#[tokio::test]
async fn replay_starts_at_requested_sequence() {
    let harness = TestHarness::new(searcher(), passing_completer());
    let job_id = harness.submit(COMPANY).await;
    let all = collect_until_terminal(&harness.orchestrator, job_id, None).await;

    let replayed = collect_until_terminal(&harness.orchestrator, job_id, Some(5)).await;

    assert_eq!(replayed[0].sequence, 5);
    assert_eq!(replayed.len(), all.len() - 4);
    assert_eq!(replayed, all[4..].to_vec());
}

#[tokio::test]
async fn evicted_sequences_are_reported() {
    let harness = TestHarness::build(
        searcher(),
        passing_completer(),
        ResearchSettings::default(),
        ProgressBus::with_limits(5, 256),
        Arc::new(FixedSimilarity(0.9)),
    );
    let job_id = harness.submit(COMPANY).await;
    let live = collect_until_terminal(&harness.orchestrator, job_id, None).await;
    assert!(live.len() > 5);

    let result = harness.orchestrator.subscribe(job_id, Some(1)).await;
    assert!(matches!(
        result,
        Err(ResearchError::SequenceEvicted { requested: 1, .. })
    ));

    // Without a sequence the retained tail is replayed
    let tail = collect_until_terminal(&harness.orchestrator, job_id, None).await;
    assert_eq!(tail.len(), 5);
    assert_eq!(tail, live[live.len() - 5..].to_vec());
    assert!(tail.windows(2).all(|w| w[1].sequence == w[0].sequence + 1));
}

#[tokio::test]
async fn slow_subscriber_is_told_it_lagged() {
    let harness = TestHarness::build(
        searcher(),
        passing_completer(),
        ResearchSettings::default(),
        ProgressBus::with_limits(1024, 2),
        Arc::new(FixedSimilarity(0.9)),
    );
    let job_id = harness.submit(COMPANY).await;
    let subscription = harness.orchestrator.subscribe(job_id, None).await.unwrap();

    harness.wait_for_terminal(job_id).await;

    let deliveries: Vec<Delivery> = tokio::time::timeout(
        Duration::from_secs(5),
        subscription.into_stream().collect::<Vec<_>>(),
    )
    .await
    .expect("stream ends after lag");

    match deliveries.last() {
        Some(Delivery::Lagged { missed }) => assert!(*missed > 0),
        other => panic!("expected lag notice, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_jobs_cannot_be_subscribed() {
    let harness = TestHarness::new(searcher(), passing_completer());

    let result = harness.orchestrator.subscribe(JobId::new(), None).await;
    assert!(matches!(result, Err(ResearchError::NotFound(_))));
}
