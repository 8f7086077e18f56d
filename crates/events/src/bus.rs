//! In-process notification bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`NotificationBus`] carries transient, user-visible [`Notification`]s.
//! Nothing is persisted: a notification published while nobody listens is
//! gone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use studio_core::types::GenerationId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A transient message for the user.
///
/// Constructed via [`Notification::info`], [`Notification::success`] or
/// [`Notification::error`], optionally tagged with
/// [`with_generation`](Notification::with_generation).
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// Generation the message is about, if any.
    pub generation_id: Option<GenerationId>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            generation_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    pub fn with_generation(mut self, generation_id: impl Into<GenerationId>) -> Self {
        self.generation_id = Some(generation_id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

// ---------------------------------------------------------------------------
// NotificationBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out notification bus.
///
/// # Usage
///
/// ```rust
/// use studio_events::{Notification, NotificationBus};
///
/// let bus = NotificationBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(Notification::success("Generation complete!"));
/// ```
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification to all current subscribers.
    pub fn publish(&self, notification: Notification) {
        if notification.is_error() {
            tracing::warn!(message = %notification.message, "User notification (error)");
        } else {
            tracing::debug!(message = %notification.message, "User notification");
        }
        // Zero receivers is not an error for transient messages.
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = NotificationBus::default();
        let mut rx = bus.subscribe();

        bus.publish(Notification::error("Connection lost").with_generation("g1"));

        let received = rx.recv().await.expect("should receive the notification");
        assert_eq!(received.level, NotificationLevel::Error);
        assert_eq!(received.message, "Connection lost");
        assert_eq!(received.generation_id.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_notification() {
        let bus = NotificationBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Notification::success("Generation complete!"));

        let n1 = rx1.recv().await.expect("subscriber 1 should receive");
        let n2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(n1.message, "Generation complete!");
        assert_eq!(n2.message, "Generation complete!");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = NotificationBus::default();
        bus.publish(Notification::info("nobody listening"));
    }

    #[test]
    fn plain_notification_has_no_generation() {
        let n = Notification::info("queued");
        assert!(n.generation_id.is_none());
        assert!(!n.is_error());
    }
}
