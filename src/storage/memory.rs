use std::collections::HashMap;

use parking_lot::Mutex;

use super::KeyValueStore;
use crate::errors::{AppError, AppResult};

/// In-process store with an optional byte quota, counted over keys and values.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self.entries.lock();

        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(AppError::storage(format!("quota of {quota} bytes exceeded")));
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> AppResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
