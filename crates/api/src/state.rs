use std::sync::Arc;

use crate::config::ServerConfig;
use crate::generator::ImageProvider;
use crate::store::GenerationStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GenerationStore>,
    /// Image backend used by background processing.
    pub provider: Arc<dyn ImageProvider>,
    pub config: Arc<ServerConfig>,
}
