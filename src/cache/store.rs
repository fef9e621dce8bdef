//! Persistence behind the indicator cache
//!
//! The cache only needs three operations from its backing store, captured by
//! `KeyValueStore`. `FileStore` keeps everything in a single JSON document.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by cache persistence
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the cache file failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache file does not hold the expected JSON
    #[error("Cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The on-disk indicator cache document
///
/// `timestamp` is shared by every key. `fetched_at` records per-key fetch
/// times and is absent from documents written before it existed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheDocument {
    /// When any key was last written
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Raw payloads keyed by indicator key
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    /// When each key was last written
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fetched_at: BTreeMap<String, DateTime<Utc>>,
}

impl CacheDocument {
    /// Stores a value and stamps both the document and the key
    pub fn insert(&mut self, key: &str, value: Value, now: DateTime<Utc>) {
        self.data.insert(key.to_string(), value);
        self.fetched_at.insert(key.to_string(), now);
        self.timestamp = Some(now);
    }
}

/// Minimal key-value interface the indicator cache is written against
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Loads the whole document, empty when it is missing or unreadable
    async fn get_all(&self) -> CacheDocument;

    /// Loads a single value
    async fn get(&self, key: &str) -> Option<Value> {
        self.get_all().await.data.remove(key)
    }

    /// Writes one value, keeping every other key currently stored
    async fn put(&self, key: &str, value: Value, now: DateTime<Utc>) -> Result<(), CacheError>;
}

/// Stores the cache document as a single JSON file
///
/// `put` re-reads the file right before writing so keys written by another
/// process since our last read survive. Two writers racing between that read
/// and the write still lose one update; the last writer wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get_all(&self) -> CacheDocument {
        read_json(&self.path).await.unwrap_or_default()
    }

    async fn put(&self, key: &str, value: Value, now: DateTime<Utc>) -> Result<(), CacheError> {
        let mut document = self.get_all().await;
        document.insert(key, value, now);
        write_json(&self.path, &document).await
    }
}

/// Reads a JSON file, logging and returning `None` on any failure
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "cache file not found");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read cache file");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring corrupt cache file");
            None
        }
    }
}

/// Writes a value as pretty JSON, creating the parent directory if needed
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
