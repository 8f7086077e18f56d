#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use studio_api::app::{build_cors_layer, build_router};
use studio_api::config::{OpenRouterConfig, ServerConfig};
use studio_api::generator::{GeneratedImage, ImageProvider, ImageRequest, ProviderError};
use studio_api::state::AppState;
use studio_api::store::{GenerationStore, MemoryStore};

/// Build a test `ServerConfig` with safe defaults and a fast poll interval.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        stream_poll_interval_ms: 10,
        openrouter: OpenRouterConfig {
            api_key: None,
            api_url: "http://127.0.0.1:9".to_string(),
            app_url: "http://localhost:3000".to_string(),
        },
    }
}

/// Provider that returns one image per model after a short delay.
/// Model ids containing `"broken"` fail.
pub struct FakeProvider {
    pub delay: Duration,
}

#[async_trait]
impl ImageProvider for FakeProvider {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<GeneratedImage>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        if request.model_id.contains("broken") {
            return Err(ProviderError::Api {
                status: 500,
                message: "model unavailable".to_string(),
            });
        }
        Ok(vec![GeneratedImage {
            url: format!("https://cdn.test/{}.png", request.model_id.replace('/', "_")),
            width: Some(1024),
            height: Some(1024),
        }])
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

/// Build the full application router with the production middleware stack,
/// an in-memory store and a fake provider.
pub fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();
    let cors = build_cors_layer(&config.cors_origins).unwrap();
    let state = AppState {
        store: store.clone() as Arc<dyn GenerationStore>,
        provider: Arc::new(FakeProvider {
            delay: Duration::from_millis(5),
        }),
        config: Arc::new(config),
    };
    TestApp {
        router: build_router(state, cors),
        store,
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = send(app, request).await;
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
