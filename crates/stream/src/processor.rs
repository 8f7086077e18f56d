//! Byte stream → typed event stream.
//!
//! Reads raw chunks from an event-stream response body, runs them through
//! the [`SseDecoder`], parses each frame into a [`StreamEvent`], and yields
//! the events in arrival order. Malformed frames are logged and skipped. A
//! read error is yielded once as [`StreamError::Transport`] and ends the
//! sequence.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use studio_core::stream_events::StreamEvent;

use crate::messages::parse_message;
use crate::source::StreamError;
use crate::sse::{SseDecoder, SseFrame};

struct DecodeState<S> {
    inner: Pin<Box<S>>,
    decoder: SseDecoder,
    ready: VecDeque<StreamEvent>,
    generation_id: String,
    done: bool,
}

/// Decode an event-stream body into typed events.
///
/// `generation_id` is only used for log context.
pub fn decode_events<S, B, E>(
    bytes: S,
    generation_id: impl Into<String>,
) -> impl Stream<Item = Result<StreamEvent, StreamError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let state = DecodeState {
        inner: Box::pin(bytes),
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        generation_id: generation_id.into(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.feed(chunk.as_ref());
                    for frame in frames {
                        handle_frame(&mut state, frame);
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        generation_id = %state.generation_id,
                        error = %e,
                        "Event stream read failed",
                    );
                    state.done = true;
                    state.ready.clear();
                    return Some((Err(StreamError::Transport(e.to_string())), state));
                }
                None => {
                    if let Some(frame) = state.decoder.finish() {
                        handle_frame(&mut state, frame);
                    }
                    state.done = true;
                }
            }
        }
    })
}

fn handle_frame<S>(state: &mut DecodeState<S>, frame: SseFrame) {
    match parse_message(&frame.data) {
        Ok(event) => {
            tracing::trace!(
                generation_id = %state.generation_id,
                kind = event.kind(),
                "Stream event received",
            );
            state.ready.push_back(event);
        }
        Err(e) => {
            tracing::warn!(
                generation_id = %state.generation_id,
                error = %e,
                raw_message = %frame.data,
                "Failed to parse stream message",
            );
        }
    }
}
