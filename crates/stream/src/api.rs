//! REST client for the studio server's generation endpoints.
//!
//! Covers submission, listing, and deletion using [`reqwest`]. Every
//! response body is wrapped in the server's `{ "data": ... }` envelope.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use studio_core::generation::{Generation, SubmitGenerationRequest, SubmitGenerationResponse};

/// Operations the session needs from the generation producer.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Submit one generation request; one call per aspect ratio.
    async fn submit_generation(
        &self,
        request: &SubmitGenerationRequest,
    ) -> Result<SubmitGenerationResponse, ApiClientError>;

    /// Fetch a page of generations, newest first.
    async fn list_generations(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Generation>, ApiClientError>;

    async fn delete_generation(&self, generation_id: &str) -> Result<(), ApiClientError>;
}

/// Errors from the studio REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    /// The HTTP request itself failed (network, DNS, TLS, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("Studio API error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// HTTP client for one studio server.
#[derive(Clone)]
pub struct StudioApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl StudioApiClient {
    /// * `base_url` - server base URL, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (shares its connection pool
    /// with the stream client).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`ApiClientError::ApiError`] holding the status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiClientError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Unwrap the `data` envelope of a successful JSON response.
    async fn parse_data<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<Envelope<T>>().await?.data)
    }
}

#[async_trait]
impl GenerationService for StudioApiClient {
    async fn submit_generation(
        &self,
        request: &SubmitGenerationRequest,
    ) -> Result<SubmitGenerationResponse, ApiClientError> {
        let response = self
            .client
            .post(self.url("/api/generations"))
            .json(request)
            .send()
            .await?;

        Self::parse_data(response).await
    }

    async fn list_generations(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Generation>, ApiClientError> {
        let response = self
            .client
            .get(self.url("/api/generations"))
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;

        Self::parse_data(response).await
    }

    async fn delete_generation(&self, generation_id: &str) -> Result<(), ApiClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/generations/{generation_id}")))
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}
