use studio_stream::api::ApiClientError;

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The request was rejected before it reached the queue.
    #[error("{0}")]
    Validation(String),

    /// The studio server rejected or failed a call.
    #[error(transparent)]
    Api(#[from] ApiClientError),

    /// The session task has stopped.
    #[error("Session is closed")]
    SessionClosed,
}
