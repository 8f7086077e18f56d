//! Stream message parser.
//!
//! Each SSE frame's `data` holds one JSON object
//! `{"type": "<kind>", "data": {...}}`. This module deserializes it into
//! the strongly-typed [`StreamEvent`] enum shared with the server.

pub use studio_core::stream_events::{
    ErrorData, GenerationCompleteData, ImageCompleteData, StreamEvent,
};

/// Parse one frame payload into a typed event.
///
/// Returns `Err` for malformed JSON or unknown `type` values.
/// Callers should log and continue; a bad payload never ends a stream.
pub fn parse_message(text: &str) -> Result<StreamEvent, serde_json::Error> {
    serde_json::from_str(text)
}
