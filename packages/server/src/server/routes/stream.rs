//! WebSocket progress stream.
//!
//! GET /research/ws/:job_id?from_sequence=N
//!
//! Replays retained events from `from_sequence` (all retained events when
//! absent), then forwards live events as `status_update` frames. The socket
//! closes after the job's terminal event. A client that falls behind gets a
//! final `lagged` frame and should reconnect with the last sequence it saw.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Path, Query,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::error::ApiError;
use crate::domains::research::events::ProgressEvent;
use crate::domains::research::models::JobId;
use crate::kernel::{Delivery, Subscription};
use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub from_sequence: Option<u64>,
}

/// Subscribes before upgrading so unknown jobs and evicted sequences are
/// reported as plain HTTP errors.
pub async fn research_ws_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<JobId>,
    Query(query): Query<StreamQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let subscription = state
        .orchestrator
        .subscribe(job_id, query.from_sequence)
        .await?;
    Ok(ws.on_upgrade(move |socket| forward_events(socket, job_id, subscription)))
}

async fn forward_events(socket: WebSocket, job_id: JobId, subscription: Subscription) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = subscription.into_stream();
    debug!(job_id = %job_id, "Progress stream opened");

    loop {
        tokio::select! {
            delivery = events.next() => match delivery {
                Some(Delivery::Event(event)) => {
                    let terminal = event.kind.is_terminal();
                    if sender.send(Message::Text(status_frame(&event).to_string())).await.is_err() {
                        break;
                    }
                    if terminal {
                        break;
                    }
                }
                Some(Delivery::Lagged { missed }) => {
                    let _ = sender.send(Message::Text(lagged_frame(missed).to_string())).await;
                    break;
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Pings are answered by axum; clients have nothing else to say.
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sender.send(Message::Close(None)).await;
    debug!(job_id = %job_id, "Progress stream closed");
}

/// `{type: "status_update", data: {status, message, phase, result?}, timestamp, sequence}`
pub fn status_frame(event: &ProgressEvent) -> Value {
    let mut data = json!({
        "status": event.kind.as_str(),
        "message": event.message,
        "phase": event.phase,
        "payload": event.payload,
    });
    if event.kind.is_terminal() {
        data["result"] = event.payload.clone();
    }

    json!({
        "type": "status_update",
        "data": data,
        "timestamp": event.timestamp,
        "sequence": event.sequence,
    })
}

fn lagged_frame(missed: u64) -> Value {
    json!({
        "type": "lagged",
        "data": {
            "missed": missed,
            "message": "Subscriber fell behind; reconnect with from_sequence or poll the job",
        },
    })
}
