//! Domain types and pure rules shared by the studio client and server.
//!
//! Nothing in this crate performs I/O. The session, stream and API crates
//! depend on it for the generation/image records, the model and style
//! catalog, request validation and the stream event wire format.

pub mod catalog;
pub mod error;
pub mod generation;
pub mod stream_events;
pub mod types;
