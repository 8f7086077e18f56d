//! Transport-agnostic source of per-generation event streams.
//!
//! The session only sees an [`EventStream`]: an asynchronous sequence of
//! typed events that ends after a terminal event or on a transport error.
//! [`StreamClient`](crate::client::StreamClient) implements it over HTTP;
//! tests implement it over in-memory channels.

use async_trait::async_trait;
use futures::stream::BoxStream;
use studio_core::stream_events::StreamEvent;

/// A live event sequence for one generation.
///
/// `Err` items are transport failures; the stream yields nothing after one.
/// Malformed payloads never surface here, they are dropped by the decoder.
pub type EventStream = BoxStream<'static, Result<StreamEvent, StreamError>>;

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Open the event stream for `generation_id`.
    async fn open(&self, generation_id: &str) -> Result<EventStream, StreamError>;
}

/// Errors raised while opening or reading an event stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The connection could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The endpoint answered with a non-success status.
    #[error("Stream endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// An established connection failed while reading.
    #[error("Transport error: {0}")]
    Transport(String),
}
