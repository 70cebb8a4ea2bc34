//! Persistent key-value storage behind an adapter that never fails.
//!
//! Backends implement [`KeyValueStore`] and report faults as [`AppError::Storage`].
//! [`SessionStorage`] owns the expiry and decode policy and turns every fault
//! into a logged miss or a logged no-op.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::errors::{AppError, AppResult};

pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> AppResult<Option<String>>;
    fn set_raw(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove_raw(&self, key: &str) -> AppResult<()>;

    /// False for contexts with no storage at all; the adapter then skips every call.
    fn is_available(&self) -> bool {
        true
    }
}

/// Stand-in for execution contexts without persistent storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get_raw(&self, _key: &str) -> AppResult<Option<String>> {
        Err(AppError::storage("storage unavailable"))
    }

    fn set_raw(&self, _key: &str, _value: &str) -> AppResult<()> {
        Err(AppError::storage("storage unavailable"))
    }

    fn remove_raw(&self, _key: &str) -> AppResult<()> {
        Err(AppError::storage("storage unavailable"))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// A stored value stamped with its write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub payload: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl<T> Envelope<T> {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}

#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage")
            .field("available", &self.store.is_available())
            .field("retention", &self.retention)
            .finish()
    }
}

impl SessionStorage {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            store,
            clock,
            retention,
        }
    }

    pub fn unavailable(clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self::new(Arc::new(UnavailableStore), clock, retention)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Same backing store, different retention window.
    pub fn with_retention(&self, retention: Duration) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            retention,
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<Envelope<T>> {
        if !self.store.is_available() {
            return None;
        }

        let raw = match self.store.get_raw(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "storage read failed");
                return None;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "discarding undecodable storage entry");
                return None;
            }
        };

        if envelope.age(self.clock.now()) > self.retention {
            tracing::debug!(key = %key, "storage entry past retention, removing");
            self.remove(key);
            return None;
        }

        Some(envelope)
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        if !self.store.is_available() {
            return;
        }

        let envelope = Envelope {
            payload: value,
            timestamp: self.clock.now(),
        };

        let raw = match serde_json::to_string(&envelope) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "failed to encode storage entry");
                return;
            }
        };

        if let Err(err) = self.store.set_raw(key, &raw) {
            tracing::warn!(key = %key, error = %err, "storage write failed");
        }
    }

    pub fn remove(&self, key: &str) {
        if !self.store.is_available() {
            return;
        }

        if let Err(err) = self.store.remove_raw(key) {
            tracing::warn!(key = %key, error = %err, "storage remove failed");
        }
    }
}
