//! Key-value persistence — the seam between the quiz state and `localStorage`.
//!
//! The page owns the real `localStorage`. On load it posts every known key to
//! `/api/session/restore`, which seeds a [`MemoryStore`]. From then on every
//! `set`/`remove` is applied in WASM memory and queued as a [`StoreWrite`];
//! routes drain the queue into a `<script>` that replays the writes on the
//! main thread, so the browser copy never lags a mutation by more than one
//! response.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use thiserror::Error;

/// Storage keys, kept compatible with data saved by earlier versions of the page.
pub mod keys {
    pub const SCORE: &str = "nmScore";
    pub const MISTAKES: &str = "nmWrongConcepts";
    pub const MASTERED: &str = "nmMasteredConceptCodes";
    pub const ANSWERS: &str = "nmAnswers";

    /// Every key the session reads on restore.
    pub const ALL: [&str; 4] = [SCORE, MISTAKES, MASTERED, ANSWERS];
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage quota exceeded writing {key} ({needed} bytes needed, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },
}

/// String key-value storage.
pub trait PersistenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str);
}

/// A write that still has to reach the browser's `localStorage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Set { key: String, value: String },
    Remove { key: String },
}

/// In-memory store that queues every mutation for the page to mirror.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    pending: Vec<StoreWrite>,
    /// Total bytes (keys + values) the store may hold. `None` = unbounded.
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Load a value that already lives in the browser. Not queued as a write.
    pub fn seed(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    /// Drain the writes not yet mirrored to the page.
    pub fn take_pending(&mut self) -> Vec<StoreWrite> {
        std::mem::take(&mut self.pending)
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl PersistenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            let available = quota.saturating_sub(self.used_bytes_without(key));
            let needed = key.len() + value.len();
            if needed > available {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }
        self.values.insert(key.to_string(), value.clone());
        self.pending.push(StoreWrite::Set {
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
        self.pending.push(StoreWrite::Remove {
            key: key.to_string(),
        });
    }
}

/// Read and parse a JSON value. Missing keys and malformed JSON both come
/// back as `None`; the latter is logged and otherwise ignored.
pub fn load_json<T, S>(store: &S, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: PersistenceStore + ?Sized,
{
    let raw = store.get(key)?;
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("[STORE] discarding malformed value under {}: {}", key, e);
            None
        }
    }
}

/// Serialize a value as JSON and write it through.
pub fn save_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: PersistenceStore + ?Sized,
{
    let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    store.set(key, json)
}

/// Writes are best effort: a failed write is logged and not retried.
pub fn log_failed_write(key: &str, result: Result<(), StoreError>) {
    if let Err(e) = result {
        log::error!("[STORE] write to {} failed: {}", key, e);
    }
}
