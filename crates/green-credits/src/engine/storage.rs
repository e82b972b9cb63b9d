use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use super::domain::ActivityLog;
use super::repository::{
    ActivityError, ActivityPublisher, Collection, PersistenceAdapter, StoreError,
};

/// Volatile adapter backed by a map; the default for tests and demo servers.
#[derive(Debug, Default, Clone)]
pub struct MemoryAdapter {
    collections: Arc<Mutex<HashMap<Collection, Vec<Value>>>>,
}

impl MemoryAdapter {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Collection, Vec<Value>>>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("memory adapter lock poisoned".to_string()))
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn load(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        Ok(self.lock()?.get(&collection).cloned().unwrap_or_default())
    }

    fn save(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError> {
        self.lock()?.insert(collection, records);
        Ok(())
    }
}

/// Adapter writing one pretty-printed JSON array per collection under `root`.
#[derive(Debug, Clone)]
pub struct JsonFileAdapter {
    root: PathBuf,
}

impl JsonFileAdapter {
    /// Create the data directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            collection: "*",
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, collection: Collection) -> PathBuf {
        self.root.join(format!("{}.json", collection.key()))
    }
}

impl PersistenceAdapter for JsonFileAdapter {
    fn load(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let raw = match fs::read(self.path_for(collection)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    collection: collection.key(),
                    source,
                })
            }
        };

        serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
            collection: collection.key(),
            source,
        })
    }

    fn save(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError> {
        let encoded =
            serde_json::to_vec_pretty(&records).map_err(|source| StoreError::Encode {
                collection: collection.key(),
                source,
            })?;

        // staged file, then an atomic rename over the live collection
        let target = self.path_for(collection);
        let staging = target.with_extension("json.tmp");
        fs::write(&staging, encoded)
            .and_then(|_| fs::rename(&staging, &target))
            .map_err(|source| StoreError::Io {
                collection: collection.key(),
                source,
            })
    }
}

/// Publisher that keeps every activity record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryActivityFeed {
    entries: Arc<Mutex<Vec<ActivityLog>>>,
}

impl MemoryActivityFeed {
    pub fn entries(&self) -> Vec<ActivityLog> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ActivityPublisher for MemoryActivityFeed {
    fn publish(&self, entry: ActivityLog) -> Result<(), ActivityError> {
        self.entries
            .lock()
            .map_err(|_| ActivityError::Transport("activity feed lock poisoned".to_string()))?
            .push(entry);
        Ok(())
    }
}
