//! Durable clip registry (§4.12), built on a Firestore REST API client.
//!
//! Production-grade client with:
//! - Token caching with refresh margin
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter
//! - Observability (tracing spans, metrics)
//!
//! ## Modules
//! - `client` - Main Firestore REST API client
//! - `token_cache` - Thread-safe access token caching
//! - `retry` - Retry policy with exponential backoff
//! - `metrics` - Prometheus metrics collection
//! - `repos` - `ClipRegistry`: save/load/promote/sweep over `clips`/`anonymous_clips`
//! - `types` - Firestore document types and value conversions

pub mod client;
#[cfg(test)]
mod client_tests;
pub mod error;
pub mod metrics;
pub mod repos;
pub mod retry;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use repos::{ClipRegistry, RegistryError, RegistryResult};
pub use retry::RetryConfig;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};

