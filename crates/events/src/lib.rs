//! User-facing notification channel for the studio session.
//!
//! - [`NotificationBus`] - in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`Notification`] - one transient message ("toast") for the user.

pub mod bus;

pub use bus::{Notification, NotificationBus, NotificationLevel};
