pub mod health;

use axum::routing::get;
use axum::Router;

use crate::handlers::{generation, stream};
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /models                         model catalog (GET)
/// /generations                    list (GET), submit (POST)
/// /generations/{id}               detail (GET), delete (DELETE)
/// /generation/{id}/stream         event stream (GET, text/event-stream)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(generation::list_models))
        .route(
            "/generations",
            get(generation::list_generations).post(generation::submit_generation),
        )
        .route(
            "/generations/{id}",
            get(generation::get_generation).delete(generation::delete_generation),
        )
        .route("/generation/{id}/stream", get(stream::stream_generation))
}
