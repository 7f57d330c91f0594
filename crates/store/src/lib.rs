//! Durable storage for evidence bundles.
//!
//! Backends implement the same narrow [`BundleStore`] contract: `get` by
//! incident id (absence is `None`, not an error) and `put` returning the
//! canonical URI of the written object. The bounded-polling retrieval in
//! [`await_bundle`] is deliberately decoupled from any backend: it takes a
//! fetch closure, so the deadline logic is testable with a fake clock.

mod error;
mod fs;
mod object;
mod polling;

use async_trait::async_trait;

pub use error::{Result, StoreError};
pub use fs::FsStore;
pub use object::ObjectStore;
pub use polling::{await_bundle, AwaitOutcome, MIN_POLL_INTERVAL};

/// A bundle as fetched from storage: the canonical URI plus the raw JSON
/// document, still unvalidated. Validation happens at the domain boundary.
#[derive(Debug, Clone)]
pub struct StoredBundle {
    pub uri: String,
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Fetch the bundle for an incident. `Ok(None)` means "not written yet".
    async fn get(&self, incident_id: &str) -> Result<Option<StoredBundle>>;

    /// Write (or overwrite) the bundle document, returning its URI.
    async fn put(&self, incident_id: &str, raw: &serde_json::Value) -> Result<String>;
}
