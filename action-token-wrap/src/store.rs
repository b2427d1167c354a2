//! Indirection store for surrogate tokens
//!
//! When an action is too long to fit in the button even unwrapped, the button
//! carries a short surrogate token instead and the store maps it back to the
//! action and its signed form until the signed form would have expired.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// What a surrogate token stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurrogatePayload {
    /// The original action string
    pub raw: String,
    /// The best signed wire form, which did not fit in the button
    pub wrapped: String,
}

/// Store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached
    #[error("Surrogate store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the operation
    #[error("Surrogate store operation failed: {0}")]
    Backend(String),
}

/// Key-value store with per-entry expiry.
///
/// Implementations must not return entries past their `expires_at`.
/// Explicit deletion is not required.
#[async_trait]
pub trait SurrogateStore: Send + Sync {
    /// Persist `payload` under `token` until `expires_at`
    async fn put(
        &self,
        token: &str,
        payload: SurrogatePayload,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Fetch the live entry for `token`, if any
    async fn get(&self, token: &str) -> Result<Option<SurrogatePayload>, StoreError>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    payload: SurrogatePayload,
    expires_at: DateTime<Utc>,
}

/// Entry count at which [`MemorySurrogateStore::put`] purges expired entries
pub const DEFAULT_PURGE_THRESHOLD: usize = 1024;

/// In-process [`SurrogateStore`].
///
/// Suitable for single-process deployments and tests; entries are lost on
/// restart, which only turns affected buttons into "expired" ones. Expired
/// entries are dropped on `put` once the map reaches the purge threshold.
#[derive(Debug)]
pub struct MemorySurrogateStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    purge_threshold: usize,
}

impl Default for MemorySurrogateStore {
    fn default() -> Self {
        Self {
            entries: RwLock::default(),
            purge_threshold: DEFAULT_PURGE_THRESHOLD,
        }
    }
}

impl MemorySurrogateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_purge_threshold(mut self, purge_threshold: usize) -> Self {
        self.purge_threshold = purge_threshold;
        self
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        before - entries.len()
    }

    /// Number of stored entries, expired or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SurrogateStore for MemorySurrogateStore {
    async fn put(
        &self,
        token: &str,
        payload: SurrogatePayload,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.purge_threshold {
            let now = Utc::now();
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at >= now);
            debug!(removed = before - entries.len(), "purged expired surrogate entries");
        }
        entries.insert(
            token.to_string(),
            MemoryEntry {
                payload,
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<SurrogatePayload>, StoreError> {
        let now = Utc::now();
        Ok(self
            .entries
            .read()
            .await
            .get(token)
            .filter(|entry| entry.expires_at >= now)
            .map(|entry| entry.payload.clone()))
    }
}
