//! HTTP event-stream client for the studio server.
//!
//! [`StreamClient`] holds the server base URL. Call
//! [`StreamClient::connect`] to open the raw `text/event-stream` response
//! for one generation, or use it through the
//! [`EventSource`](crate::source::EventSource) trait to get typed events.

use async_trait::async_trait;
use futures::StreamExt;

use crate::processor::decode_events;
use crate::source::{EventSource, EventStream, StreamError};

/// Configuration handle for the per-generation stream endpoint.
#[derive(Clone)]
pub struct StreamClient {
    client: reqwest::Client,
    base_url: String,
}

/// An open event-stream response for a single generation.
pub struct StreamConnection {
    pub generation_id: String,
    /// The streaming response; its body is the event stream.
    pub response: reqwest::Response,
}

impl StreamClient {
    /// * `base_url` - server base URL, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (shares its connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the stream endpoint for `generation_id`.
    pub fn stream_url(&self, generation_id: &str) -> String {
        format!("{}/api/generation/{}/stream", self.base_url, generation_id)
    }

    /// Open the event-stream connection for a generation.
    pub async fn connect(&self, generation_id: &str) -> Result<StreamConnection, StreamError> {
        let url = self.stream_url(generation_id);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| StreamError::Connection(format!("Failed to connect to {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(generation_id = %generation_id, "Connected to generation stream");

        Ok(StreamConnection {
            generation_id: generation_id.to_string(),
            response,
        })
    }
}

#[async_trait]
impl EventSource for StreamClient {
    async fn open(&self, generation_id: &str) -> Result<EventStream, StreamError> {
        let conn = self.connect(generation_id).await?;
        Ok(decode_events(conn.response.bytes_stream(), conn.generation_id).boxed())
    }
}
