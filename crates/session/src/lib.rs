//! Client-side studio session.
//!
//! Coordinates the local job queue, one event stream per in-flight
//! generation, the merge of stream events into optimistic view state, and
//! the image cache that keeps gallery objects stable between snapshots.

pub mod cache;
pub mod config;
pub mod error;
pub mod merge;
pub mod queue;
pub mod session;

pub use cache::{GalleryImage, ImageCache};
pub use config::SessionConfig;
pub use error::SubmissionError;
pub use session::{QueueRequest, SessionHandle, StudioSession, ViewSnapshot};
