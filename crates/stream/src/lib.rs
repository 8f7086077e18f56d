//! Client side of the per-generation event stream and the studio HTTP API.
//!
//! Provides an incremental SSE decoder, typed message parsing, a reqwest
//! backed [`EventSource`](source::EventSource), the set of live
//! per-generation subscriptions, and the HTTP client used to submit, list
//! and delete generations.

pub mod api;
pub mod client;
pub mod messages;
pub mod processor;
pub mod source;
pub mod sse;
pub mod subscription;
