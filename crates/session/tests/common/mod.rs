#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use studio_core::generation::{
    Generation, GenerationStatus, SubmitGenerationRequest, SubmitGenerationResponse,
};
use studio_core::stream_events::StreamEvent;
use studio_events::NotificationBus;
use studio_session::{SessionConfig, SessionHandle, StudioSession, ViewSnapshot};
use studio_stream::api::{ApiClientError, GenerationService};
use studio_stream::source::{EventSource, EventStream, StreamError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub type Feed = mpsc::UnboundedSender<Result<StreamEvent, StreamError>>;

/// In-memory generation service.
///
/// Accepts every request whose prompt is not `"fail"`, naming the generation
/// `gen-<aspect ratio>-<n>`. Tracks how many distinct prompts are being
/// submitted at once.
#[derive(Default)]
pub struct MockService {
    pub requests: Mutex<Vec<SubmitGenerationRequest>>,
    pub stored: Mutex<Vec<Generation>>,
    pub deleted: Mutex<Vec<String>>,
    in_flight: Mutex<HashMap<String, usize>>,
    pub max_concurrent_items: Mutex<usize>,
    pub delay: Option<Duration>,
}

impl MockService {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    fn enter(&self, prompt: &str) {
        let mut in_flight = self.in_flight.lock().unwrap();
        *in_flight.entry(prompt.to_string()).or_default() += 1;
        let mut max = self.max_concurrent_items.lock().unwrap();
        *max = (*max).max(in_flight.len());
    }

    fn leave(&self, prompt: &str) {
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(count) = in_flight.get_mut(prompt) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(prompt);
            }
        }
    }
}

#[async_trait]
impl GenerationService for MockService {
    async fn submit_generation(
        &self,
        request: &SubmitGenerationRequest,
    ) -> Result<SubmitGenerationResponse, ApiClientError> {
        self.enter(&request.prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        self.leave(&request.prompt);

        if request.prompt == "fail" {
            return Err(ApiClientError::ApiError {
                status: 500,
                body: "provider unavailable".to_string(),
            });
        }
        Ok(SubmitGenerationResponse {
            generation_id: format!("gen-{}-{n}", request.aspect_ratio),
            status: GenerationStatus::Processing,
        })
    }

    async fn list_generations(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Generation>, ApiClientError> {
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete_generation(&self, generation_id: &str) -> Result<(), ApiClientError> {
        let mut stored = self.stored.lock().unwrap();
        let before = stored.len();
        stored.retain(|g| g.id != generation_id);
        if stored.len() == before {
            return Err(ApiClientError::ApiError {
                status: 404,
                body: "not found".to_string(),
            });
        }
        self.deleted.lock().unwrap().push(generation_id.to_string());
        Ok(())
    }
}

/// Event source whose streams are fed by the test.
#[derive(Default)]
pub struct MockSource {
    feeds: Mutex<HashMap<String, Feed>>,
    pub opened: Mutex<HashSet<String>>,
}

impl MockSource {
    pub async fn feed(&self, generation_id: &str) -> Feed {
        for _ in 0..200 {
            if let Some(feed) = self.feeds.lock().unwrap().get(generation_id) {
                return feed.clone();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stream for {generation_id} never opened");
    }

    /// Drop the producer side so the stream ends.
    pub fn cut(&self, generation_id: &str) {
        self.feeds.lock().unwrap().remove(generation_id);
    }
}

#[async_trait]
impl EventSource for MockSource {
    async fn open(&self, generation_id: &str) -> Result<EventStream, StreamError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds
            .lock()
            .unwrap()
            .insert(generation_id.to_string(), tx);
        self.opened.lock().unwrap().insert(generation_id.to_string());
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

pub struct Harness {
    pub handle: SessionHandle,
    pub task: JoinHandle<()>,
    pub service: Arc<MockService>,
    pub source: Arc<MockSource>,
    pub bus: Arc<NotificationBus>,
}

pub fn start(service: MockService, initial: Vec<Generation>) -> Harness {
    let service = Arc::new(service);
    let source = Arc::new(MockSource::default());
    let bus = Arc::new(NotificationBus::default());
    let config = SessionConfig {
        shutdown_timeout: Duration::from_secs(1),
        ..SessionConfig::default()
    };
    let (handle, task) = StudioSession::spawn(
        service.clone(),
        source.clone(),
        bus.clone(),
        config,
        initial,
    );
    Harness {
        handle,
        task,
        service,
        source,
        bus,
    }
}

/// Wait (up to two seconds) for a snapshot satisfying `pred`.
pub async fn wait_for<F>(handle: &SessionHandle, pred: F) -> ViewSnapshot
where
    F: Fn(&ViewSnapshot) -> bool,
{
    let mut rx = handle.watch();
    let result = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| pred(s))).await;
    match result {
        Ok(Ok(snapshot)) => snapshot.clone(),
        Ok(Err(_)) => panic!("session stopped before condition was met"),
        Err(_) => panic!("timed out; last snapshot: {:?}", handle.snapshot()),
    }
}
