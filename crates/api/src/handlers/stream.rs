//! Per-generation event stream.
//!
//! `GET /api/generation/{id}/stream` answers with `text/event-stream`. A
//! spawned poller reads the store on a fixed interval and pushes
//! `image_complete` for each image it has not sent yet, then a single
//! `generation_complete` once the generation is terminal, and closes.
//! Store failures become `error` events and polling continues. The poller
//! stops as soon as the client disconnects.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use studio_core::error::CoreError;
use studio_core::stream_events::{
    ErrorData, GenerationCompleteData, ImageCompleteData, StreamEvent,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::AppResult;
use crate::state::AppState;
use crate::store::{GenerationRecord, GenerationStore};

/// Events buffered per connection before the poller waits for the client.
const CHANNEL_CAPACITY: usize = 32;

const POLLING_ERROR: &str = "Polling error";
const NOT_FOUND_ERROR: &str = "Generation not found";

/// GET /api/generation/{id}/stream
pub async fn stream_generation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if state.store.get(&id).await?.is_none() {
        return Err(CoreError::NotFound {
            entity: "Generation",
            id,
        }
        .into());
    }

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tracing::debug!(generation_id = %id, "Event stream opened");
    tokio::spawn(poll_generation(
        Arc::clone(&state.store),
        id,
        state.config.stream_poll_interval(),
        tx,
    ));

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

/// Poll the store until the generation is terminal or the client leaves.
async fn poll_generation(
    store: Arc<dyn GenerationStore>,
    generation_id: String,
    interval: Duration,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) {
    let mut ticker = tokio::time::interval(interval);
    let mut last_seq = 0u64;

    loop {
        tokio::select! {
            _ = tx.closed() => {
                tracing::debug!(generation_id = %generation_id, "Event stream client disconnected");
                return;
            }
            _ = ticker.tick() => {}
        }

        let (events, done) = match store.get(&generation_id).await {
            Ok(Some(record)) => collect_events(&record, &mut last_seq),
            Ok(None) => (vec![error_event(NOT_FOUND_ERROR)], true),
            Err(e) => {
                tracing::error!(generation_id = %generation_id, error = %e, "Event stream poll failed");
                (vec![error_event(POLLING_ERROR)], false)
            }
        };

        for event in events {
            if tx.send(Ok(to_sse(&event))).await.is_err() {
                return;
            }
        }

        if done {
            tracing::debug!(generation_id = %generation_id, "Event stream completed");
            return;
        }
    }
}

/// Events owed to a client that has seen images up to `last_seq`.
///
/// Advances `last_seq`. Returns `true` as the second element when the
/// generation is terminal; the last event is then `generation_complete`.
pub fn collect_events(record: &GenerationRecord, last_seq: &mut u64) -> (Vec<StreamEvent>, bool) {
    let mut events: Vec<StreamEvent> = record
        .images
        .iter()
        .filter(|img| img.seq > *last_seq)
        .map(|img| {
            StreamEvent::ImageComplete(ImageCompleteData {
                id: img.id.clone(),
                generation_id: img.generation_id.clone(),
                url: img.url.clone(),
                model_name: img.model_name.clone(),
                width: img.width,
                height: img.height,
                created_at: Some(img.created_at),
            })
        })
        .collect();

    if let Some(max) = record.images.iter().map(|img| img.seq).max() {
        *last_seq = (*last_seq).max(max);
    }

    let done = record.status.is_terminal();
    if done {
        events.push(StreamEvent::GenerationComplete(GenerationCompleteData {
            generation_id: record.id.clone(),
            status: record.status,
            total_images: record.images.len() as u32,
        }));
    }
    (events, done)
}

fn error_event(message: &str) -> StreamEvent {
    StreamEvent::Error(ErrorData {
        message: message.to_string(),
    })
}

fn to_sse(event: &StreamEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            tracing::error!(error = %e, kind = event.kind(), "Failed to serialize stream event");
            Event::default().comment("serialization error")
        }
    }
}
