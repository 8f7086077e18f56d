//! The studio session: one task that owns all client-side view state.
//!
//! [`StudioSession`] holds the job queue, the generation list, the image
//! cache and the live stream subscriptions. Every mutation happens on its
//! task, in the order inputs arrive on its inbox. Callers talk to it through
//! a cloneable [`SessionHandle`] and observe it through [`ViewSnapshot`]s
//! published on a `watch` channel plus toasts on the [`NotificationBus`].
//!
//! Submissions run on a spawned task so the session keeps folding stream
//! events while a submission is awaited; the result comes back through the
//! inbox and only then is the drain guard released.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use studio_core::catalog;
use studio_core::generation::{Generation, ReferenceImage, SubmitGenerationRequest};
use studio_core::stream_events::StreamEvent;
use studio_core::types::GenerationId;
use studio_events::{Notification, NotificationBus};
use studio_stream::api::GenerationService;
use studio_stream::source::EventSource;
use studio_stream::subscription::{SubscriptionMessage, SubscriptionSet, SubscriptionUpdate};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::cache::{GalleryImage, ImageCache};
use crate::config::SessionConfig;
use crate::error::SubmissionError;
use crate::merge::reconcile;
use crate::queue::{JobQueue, QueueItem, QueueStatus};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// What the user asked for: one prompt across aspect ratios and models.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub aspect_ratios: Vec<String>,
    pub model_ids: Vec<String>,
    pub reference_images: Vec<ReferenceImage>,
    /// Artistic style ids appended to the prompt as keywords.
    pub style_ids: Vec<String>,
}

/// Everything a renderer needs, published after each state change.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    /// Newest first.
    pub generations: Vec<Generation>,
    /// Flattened, cached feed. Unchanged images keep their `Arc`.
    pub gallery: Vec<Arc<GalleryImage>>,
    pub queue: Vec<QueueItem>,
    pub pending_count: usize,
    pub processing_count: usize,
    /// Generation ids with a live stream, sorted.
    pub streaming: Vec<GenerationId>,
}

/// A generation the server accepted for one aspect ratio.
#[derive(Debug, Clone)]
struct Accepted {
    generation_id: GenerationId,
    aspect_ratio: String,
}

enum SessionInput {
    Enqueue(QueueItem),
    ReplaceGenerations(Vec<Generation>),
    Submitted {
        item: QueueItem,
        result: Result<Vec<Accepted>, SubmissionError>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable front door to a running [`StudioSession`].
#[derive(Clone)]
pub struct SessionHandle {
    inbox: mpsc::UnboundedSender<SessionInput>,
    snapshots: watch::Receiver<ViewSnapshot>,
    notifications: Arc<NotificationBus>,
    service: Arc<dyn GenerationService>,
    list_limit: u32,
}

impl SessionHandle {
    /// Validate `request` and append it to the queue.
    ///
    /// Returns the queue item id. Validation failures are also published as
    /// error toasts.
    pub fn enqueue(&self, request: QueueRequest) -> Result<String, SubmissionError> {
        let item = match build_item(request) {
            Ok(item) => item,
            Err(message) => {
                self.notifications.publish(Notification::error(message.clone()));
                return Err(SubmissionError::Validation(message));
            }
        };

        let ratios = item.aspect_ratios.len();
        let id = item.id.clone();
        self.send(SessionInput::Enqueue(item))?;

        let suffix = if ratios == 1 { "" } else { "s" };
        self.notifications.publish(Notification::success(format!(
            "Queued for generation ({ratios} aspect ratio{suffix})"
        )));
        Ok(id)
    }

    /// Replace the whole generation list (initial load, refresh, or a
    /// switch to another user's data).
    pub fn replace_generations(&self, generations: Vec<Generation>) -> Result<(), SubmissionError> {
        self.send(SessionInput::ReplaceGenerations(generations))
    }

    /// Delete a generation on the server, then reload the list.
    pub async fn delete(&self, generation_id: &str) -> Result<(), SubmissionError> {
        if let Err(e) = self.service.delete_generation(generation_id).await {
            tracing::error!(generation_id = %generation_id, error = %e, "Failed to delete generation");
            self.notifications
                .publish(Notification::error("Failed to delete generation").with_generation(generation_id));
            return Err(e.into());
        }
        self.refresh().await
    }

    /// Reload the first page of generations from the server.
    pub async fn refresh(&self) -> Result<(), SubmissionError> {
        let generations = self.service.list_generations(self.list_limit, 0).await?;
        self.replace_generations(generations)
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that wakes on every published snapshot.
    pub fn watch(&self) -> watch::Receiver<ViewSnapshot> {
        self.snapshots.clone()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Ask the session to close every subscription and stop.
    pub fn shutdown(&self) -> Result<(), SubmissionError> {
        self.send(SessionInput::Shutdown)
    }

    fn send(&self, input: SessionInput) -> Result<(), SubmissionError> {
        self.inbox
            .send(input)
            .map_err(|_| SubmissionError::SessionClosed)
    }
}

fn build_item(request: QueueRequest) -> Result<QueueItem, String> {
    if request.prompt.trim().is_empty() {
        return Err("Please enter a prompt".to_string());
    }
    if request.model_ids.is_empty() {
        return Err("Please select at least one model".to_string());
    }
    if request.aspect_ratios.is_empty() {
        return Err("Please select at least one aspect ratio".to_string());
    }

    let prompt = catalog::enhance_prompt(&request.prompt, &request.style_ids);
    let mut model_ids: Vec<String> = Vec::with_capacity(request.model_ids.len());
    for id in request.model_ids {
        if !model_ids.contains(&id) {
            model_ids.push(id);
        }
    }
    let model_names = catalog::model_names_for(&model_ids);

    Ok(QueueItem {
        id: uuid::Uuid::new_v4().to_string(),
        prompt,
        negative_prompt: request.negative_prompt,
        aspect_ratios: request.aspect_ratios,
        model_ids,
        model_names,
        selected_styles: request.style_ids,
        reference_images: request.reference_images,
        status: QueueStatus::Pending,
        error: None,
    })
}

// ---------------------------------------------------------------------------
// Session task
// ---------------------------------------------------------------------------

pub struct StudioSession {
    service: Arc<dyn GenerationService>,
    notifications: Arc<NotificationBus>,
    config: SessionConfig,

    queue: JobQueue,
    generations: Vec<Generation>,
    cache: ImageCache,
    subscriptions: SubscriptionSet,

    inbox_rx: mpsc::UnboundedReceiver<SessionInput>,
    /// Weak so that dropping every handle ends the session.
    inbox_tx: mpsc::WeakUnboundedSender<SessionInput>,
    updates_rx: mpsc::UnboundedReceiver<SubscriptionUpdate>,
    snapshot_tx: watch::Sender<ViewSnapshot>,
}

impl StudioSession {
    /// Build a session seeded with `initial` generations and its handle.
    pub fn new(
        service: Arc<dyn GenerationService>,
        source: Arc<dyn EventSource>,
        notifications: Arc<NotificationBus>,
        config: SessionConfig,
        initial: Vec<Generation>,
    ) -> (Self, SessionHandle) {
        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(ViewSnapshot::default());

        let handle = SessionHandle {
            inbox: inbox.clone(),
            snapshots,
            notifications: Arc::clone(&notifications),
            service: Arc::clone(&service),
            list_limit: config.list_limit,
        };

        let mut session = Self {
            service,
            notifications,
            config,
            queue: JobQueue::new(),
            generations: initial,
            cache: ImageCache::new(),
            subscriptions: SubscriptionSet::new(source, updates_tx),
            inbox_rx,
            inbox_tx: inbox.downgrade(),
            updates_rx,
            snapshot_tx,
        };
        session.publish_snapshot();

        (session, handle)
    }

    /// Build a session and run it on a new task.
    pub fn spawn(
        service: Arc<dyn GenerationService>,
        source: Arc<dyn EventSource>,
        notifications: Arc<NotificationBus>,
        config: SessionConfig,
        initial: Vec<Generation>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (session, handle) = Self::new(service, source, notifications, config, initial);
        (handle, tokio::spawn(session.run()))
    }

    /// Process inputs until shutdown or until every handle is dropped, then
    /// close all subscriptions.
    pub async fn run(mut self) {
        tracing::info!(generations = self.generations.len(), "Studio session started");

        loop {
            tokio::select! {
                input = self.inbox_rx.recv() => match input {
                    Some(SessionInput::Shutdown) | None => break,
                    Some(input) => self.handle_input(input),
                },
                Some(update) = self.updates_rx.recv() => self.handle_update(update),
            }
        }

        self.subscriptions.shutdown(self.config.shutdown_timeout).await;
        self.publish_snapshot();
        tracing::info!("Studio session stopped");
    }

    fn handle_input(&mut self, input: SessionInput) {
        match input {
            SessionInput::Enqueue(item) => {
                tracing::info!(
                    item_id = %item.id,
                    aspect_ratios = item.aspect_ratios.len(),
                    models = item.model_ids.len(),
                    "Queue item added",
                );
                self.queue.push(item);
                self.publish_snapshot();
                self.drain();
            }
            SessionInput::ReplaceGenerations(generations) => {
                tracing::debug!(count = generations.len(), "Replacing generation list");
                self.generations = generations;
                self.publish_snapshot();
            }
            SessionInput::Submitted { item, result } => self.finish_submission(item, result),
            SessionInput::Shutdown => {}
        }
    }

    /// Start the next pending item if nothing is in flight.
    fn drain(&mut self) {
        let Some(item) = self.queue.try_claim_next() else {
            return;
        };

        tracing::info!(
            item_id = %item.id,
            aspect_ratios = ?item.aspect_ratios,
            "Submitting queue item",
        );
        self.publish_snapshot();

        let service = Arc::clone(&self.service);
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = submit_item(service.as_ref(), &item).await;
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(SessionInput::Submitted { item, result });
            }
        });
    }

    fn finish_submission(&mut self, item: QueueItem, result: Result<Vec<Accepted>, SubmissionError>) {
        match result {
            Ok(accepted) => {
                let created_at = Utc::now();
                let fresh: Vec<Generation> = accepted
                    .iter()
                    .map(|a| {
                        let mut generation = Generation::optimistic(
                            a.generation_id.clone(),
                            &item.prompt,
                            &a.aspect_ratio,
                            &item.model_names,
                            created_at,
                        );
                        generation.negative_prompt = item.negative_prompt.clone();
                        generation
                    })
                    .collect();

                for a in &accepted {
                    self.subscriptions.open(&a.generation_id);
                }

                let mut generations = fresh;
                generations.append(&mut self.generations);
                self.generations = generations;

                self.queue.finish(&item.id, Ok(()));
                tracing::info!(
                    item_id = %item.id,
                    generations = accepted.len(),
                    "Queue item submitted",
                );
            }
            Err(e) => {
                tracing::error!(item_id = %item.id, error = %e, "Queue item submission failed");
                self.queue.finish(&item.id, Err(e.to_string()));
                self.notifications
                    .publish(Notification::error(format!("Failed to start generation: {e}")));
            }
        }

        self.publish_snapshot();
        self.drain();
    }

    fn handle_update(&mut self, update: SubscriptionUpdate) {
        let generation_id = update.generation_id;
        if !self.subscriptions.contains(&generation_id) {
            tracing::debug!(generation_id = %generation_id, "Update for closed subscription ignored");
            return;
        }

        match update.message {
            SubscriptionMessage::Event(event) => {
                match &event {
                    StreamEvent::GenerationComplete(data) => {
                        tracing::info!(
                            generation_id = %generation_id,
                            status = data.status.as_str(),
                            total_images = data.total_images,
                            "Generation finished"
                        );
                        self.notifications.publish(
                            Notification::success("Generation complete!")
                                .with_generation(generation_id.clone()),
                        );
                    }
                    StreamEvent::Error(data) => {
                        self.notifications.publish(
                            Notification::error(data.message.clone())
                                .with_generation(generation_id.clone()),
                        );
                    }
                    StreamEvent::ImageComplete(_) => {}
                }

                let generations = std::mem::take(&mut self.generations);
                self.generations = reconcile(generations, &event);

                if event.is_terminal() {
                    self.subscriptions.close(&generation_id);
                }
            }
            SubscriptionMessage::Lost(reason) => {
                tracing::warn!(generation_id = %generation_id, reason = %reason, "Generation stream lost");
                self.subscriptions.close(&generation_id);
                self.notifications
                    .publish(Notification::error("Connection lost").with_generation(generation_id));
            }
        }

        self.publish_snapshot();
    }

    fn publish_snapshot(&mut self) {
        let gallery = self.cache.gallery(&self.generations);
        let mut streaming = self.subscriptions.ids();
        streaming.sort();

        self.snapshot_tx.send_replace(ViewSnapshot {
            generations: self.generations.clone(),
            gallery,
            queue: self.queue.items().to_vec(),
            pending_count: self.queue.pending_count(),
            processing_count: self.queue.processing_count(),
            streaming,
        });
    }
}

/// Submit one request per aspect ratio, concurrently.
///
/// Any failure fails the whole item; accepted siblings are not rolled back.
async fn submit_item(
    service: &dyn GenerationService,
    item: &QueueItem,
) -> Result<Vec<Accepted>, SubmissionError> {
    let requests = item.aspect_ratios.iter().map(|ratio| {
        let request = SubmitGenerationRequest {
            prompt: item.prompt.clone(),
            negative_prompt: item.negative_prompt.clone(),
            aspect_ratio: ratio.clone(),
            model_ids: item.model_ids.clone(),
            reference_images: item.reference_images.clone(),
        };
        async move {
            let response = service.submit_generation(&request).await?;
            Ok::<_, SubmissionError>(Accepted {
                generation_id: response.generation_id,
                aspect_ratio: request.aspect_ratio,
            })
        }
    });

    join_all(requests).await.into_iter().collect()
}
