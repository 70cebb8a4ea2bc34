use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::KeyValueStore;
use crate::errors::{AppError, AppResult};

/// All entries kept as one JSON object in a single file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> AppResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                AppError::storage(format!("corrupt store {}: {err}", self.path.display()))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(AppError::storage(format!(
                "failed to read {}: {err}",
                self.path.display()
            ))),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                AppError::storage(format!("failed to create {}: {err}", parent.display()))
            })?;
        }

        let contents = serde_json::to_string_pretty(entries)
            .map_err(|err| AppError::storage(format!("failed to encode store: {err}")))?;

        // Write beside the target then rename, so readers never see a half-written file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)
            .map_err(|err| AppError::storage(format!("failed to write {}: {err}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            AppError::storage(format!("failed to replace {}: {err}", self.path.display()))
        })
    }
}

impl KeyValueStore for FileStore {
    fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> AppResult<()> {
        let _guard = self.lock.lock();
        // A corrupt file is replaced rather than blocking every future write.
        let mut entries = self.load().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove_raw(&self, key: &str) -> AppResult<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load().unwrap_or_default();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}
