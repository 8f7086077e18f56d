//! Image studio API server library.
//!
//! Exposes config, state, error handling, the store and provider seams,
//! background processing and the routes, so integration tests and the
//! binary entrypoint build the same application.

pub mod app;
pub mod config;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod openrouter;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
