use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use studio_core::stream_events::StreamEvent;
use studio_core::types::GenerationId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::source::EventSource;

/// Channel sender half that subscription tasks report into.
pub type UpdateSender = mpsc::UnboundedSender<SubscriptionUpdate>;

/// Something observed on one generation's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub generation_id: GenerationId,
    pub message: SubscriptionMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionMessage {
    /// A parsed event from the producer.
    Event(StreamEvent),
    /// The connection failed or closed before a terminal event.
    /// Carries the underlying reason for logging.
    Lost(String),
}

/// One live connection for one generation.
struct Subscription {
    cancel: CancellationToken,
    task_handle: JoinHandle<()>,
}

/// The set of live per-generation subscriptions owned by a session.
///
/// At most one subscription exists per generation id. Each runs as its own
/// task and forwards [`SubscriptionUpdate`]s to the session's channel; the
/// task ends on its own after a terminal event or a lost connection, and the
/// session removes the entry when it handles that update.
pub struct SubscriptionSet {
    source: Arc<dyn EventSource>,
    updates: UpdateSender,
    active: HashMap<GenerationId, Subscription>,
}

impl SubscriptionSet {
    pub fn new(source: Arc<dyn EventSource>, updates: UpdateSender) -> Self {
        Self {
            source,
            updates,
            active: HashMap::new(),
        }
    }

    /// Open a subscription for `generation_id`.
    ///
    /// Returns `false` (and opens nothing) when one is already live.
    pub fn open(&mut self, generation_id: &str) -> bool {
        if self.active.contains_key(generation_id) {
            tracing::debug!(generation_id = %generation_id, "Subscription already open");
            return false;
        }

        let cancel = CancellationToken::new();
        let task_handle = tokio::spawn(run_subscription(
            Arc::clone(&self.source),
            generation_id.to_string(),
            self.updates.clone(),
            cancel.clone(),
        ));

        self.active.insert(
            generation_id.to_string(),
            Subscription {
                cancel,
                task_handle,
            },
        );
        true
    }

    /// Close and remove the subscription for `generation_id`.
    ///
    /// Returns `false` when no such subscription was live.
    pub fn close(&mut self, generation_id: &str) -> bool {
        match self.active.remove(generation_id) {
            Some(sub) => {
                sub.cancel.cancel();
                tracing::debug!(generation_id = %generation_id, "Subscription closed");
                true
            }
            None => false,
        }
    }

    /// Close every subscription and wait up to `timeout` per task for it to
    /// exit.
    pub async fn shutdown(&mut self, timeout: Duration) {
        let count = self.active.len();
        for (_, sub) in self.active.drain() {
            sub.cancel.cancel();
            let _ = tokio::time::timeout(timeout, sub.task_handle).await;
        }
        tracing::info!(count, "Closed all generation subscriptions");
    }

    pub fn contains(&self, generation_id: &str) -> bool {
        self.active.contains_key(generation_id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn ids(&self) -> Vec<GenerationId> {
        self.active.keys().cloned().collect()
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        for sub in self.active.values() {
            sub.cancel.cancel();
        }
    }
}

/// Body of one subscription task: open → forward events → stop.
///
/// Stops after forwarding a terminal event, after reporting a lost
/// connection, or as soon as `cancel` fires. Nothing is sent after
/// cancellation.
async fn run_subscription(
    source: Arc<dyn EventSource>,
    generation_id: GenerationId,
    updates: UpdateSender,
    cancel: CancellationToken,
) {
    let send = |message: SubscriptionMessage| {
        let _ = updates.send(SubscriptionUpdate {
            generation_id: generation_id.clone(),
            message,
        });
    };

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = source.open(&generation_id) => result,
    };

    let mut events = match opened {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(generation_id = %generation_id, error = %e, "Failed to open generation stream");
            send(SubscriptionMessage::Lost(e.to_string()));
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(generation_id = %generation_id, "Subscription task cancelled");
                return;
            }
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                let terminal = event.is_terminal();
                send(SubscriptionMessage::Event(event));
                if terminal {
                    return;
                }
            }
            Some(Err(e)) => {
                tracing::error!(generation_id = %generation_id, error = %e, "Generation stream connection error");
                send(SubscriptionMessage::Lost(e.to_string()));
                return;
            }
            None => {
                tracing::warn!(generation_id = %generation_id, "Generation stream closed before completion");
                send(SubscriptionMessage::Lost("stream closed".to_string()));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use studio_core::generation::GenerationStatus;
    use studio_core::stream_events::GenerationCompleteData;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    use super::*;
    use crate::source::{EventStream, StreamError};

    type Feed = mpsc::UnboundedSender<Result<StreamEvent, StreamError>>;

    /// Source whose streams are fed by the test through channels.
    #[derive(Default)]
    struct ChannelSource {
        feeds: Mutex<HashMap<String, Feed>>,
    }

    impl ChannelSource {
        fn feed(&self, generation_id: &str) -> Feed {
            self.feeds.lock().unwrap()[generation_id].clone()
        }
    }

    #[async_trait]
    impl EventSource for ChannelSource {
        async fn open(&self, generation_id: &str) -> Result<EventStream, StreamError> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.feeds
                .lock()
                .unwrap()
                .insert(generation_id.to_string(), tx);
            Ok(UnboundedReceiverStream::new(rx).boxed())
        }
    }

    fn complete(generation_id: &str) -> StreamEvent {
        StreamEvent::GenerationComplete(GenerationCompleteData {
            generation_id: generation_id.to_string(),
            status: GenerationStatus::Completed,
            total_images: 0,
        })
    }

    async fn wait_for_feed(source: &ChannelSource, generation_id: &str) -> Feed {
        for _ in 0..100 {
            if let Some(feed) = source.feeds.lock().unwrap().get(generation_id) {
                return feed.clone();
            }
            tokio::task::yield_now().await;
        }
        panic!("stream for {generation_id} never opened");
    }

    #[tokio::test]
    async fn open_is_idempotent_per_generation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut set = SubscriptionSet::new(Arc::new(ChannelSource::default()), tx);

        assert!(set.open("g1"));
        assert!(!set.open("g1"));
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn terminal_event_is_forwarded() {
        let source = Arc::new(ChannelSource::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut set = SubscriptionSet::new(source.clone(), tx);

        set.open("g1");
        let feed = wait_for_feed(&source, "g1").await;
        feed.send(Ok(complete("g1"))).unwrap();

        let update = rx.recv().await.expect("update");
        assert_eq!(update.generation_id, "g1");
        assert_eq!(update.message, SubscriptionMessage::Event(complete("g1")));
    }

    #[tokio::test]
    async fn transport_error_reports_lost() {
        let source = Arc::new(ChannelSource::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut set = SubscriptionSet::new(source.clone(), tx);

        set.open("g1");
        let feed = wait_for_feed(&source, "g1").await;
        feed.send(Err(StreamError::Transport("reset".into()))).unwrap();

        let update = rx.recv().await.expect("update");
        assert!(matches!(update.message, SubscriptionMessage::Lost(_)));
    }

    #[tokio::test]
    async fn stream_ending_without_terminal_event_reports_lost() {
        let source = Arc::new(ChannelSource::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut set = SubscriptionSet::new(source.clone(), tx);

        set.open("g1");
        let _ = wait_for_feed(&source, "g1").await;
        source.feeds.lock().unwrap().remove("g1");

        let update = rx.recv().await.expect("update");
        assert_eq!(
            update.message,
            SubscriptionMessage::Lost("stream closed".to_string())
        );
    }

    #[tokio::test]
    async fn closed_subscription_forwards_nothing() {
        let source = Arc::new(ChannelSource::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut set = SubscriptionSet::new(source.clone(), tx);

        set.open("g1");
        let feed = wait_for_feed(&source, "g1").await;
        assert!(set.close("g1"));
        assert!(!set.contains("g1"));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = feed.send(Ok(complete("g1")));
        drop(set);

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_closes_everything() {
        let source = Arc::new(ChannelSource::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut set = SubscriptionSet::new(source.clone(), tx);

        set.open("g1");
        set.open("g2");
        set.shutdown(Duration::from_secs(1)).await;

        assert!(set.is_empty());
        assert!(!set.contains("g1"));
    }

    #[tokio::test]
    async fn updates_are_tagged_with_their_generation() {
        let source = Arc::new(ChannelSource::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut set = SubscriptionSet::new(source.clone(), tx);

        set.open("g1");
        set.open("g2");
        let _ = wait_for_feed(&source, "g1").await;
        let _ = wait_for_feed(&source, "g2").await;
        source.feed("g2").send(Ok(complete("g2"))).unwrap();

        let update = rx.recv().await.expect("update");
        assert_eq!(update.generation_id, "g2");
        let mut ids = set.ids();
        ids.sort();
        assert_eq!(ids, vec!["g1".to_string(), "g2".to_string()]);
    }
}
