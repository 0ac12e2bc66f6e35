//! Durable snapshots of the path cache.
//!
//! The process may be restarted between any two ticks, so the cache is
//! periodically written to a key/value store and rebuilt from it on start.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::path_cache::PathCache;
use crate::error::{PathCacheError, Result};
use crate::utils::pathfinding::PathResult;

/// Directory under the platform data dir used when no state dir is given.
pub const STATE_DIR_NAME: &str = "colony-paths";

/// One persisted cache entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPath {
    pub origin_key: String,
    pub destination_key: String,
    pub value: PathResult,
    pub inserted_at_tick: u64,
    /// Missing in older snapshots; the cache's entry TTL applies then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

/// Everything written to the store under the cache's key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Least-recently-used first.
    pub paths: Vec<PersistedPath>,
    /// Reserved for cost matrices; always written empty.
    #[serde(default)]
    pub regions: Vec<serde_json::Value>,
}

impl CacheSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Newest insertion tick in the snapshot; a restarted run resumes from it.
    pub fn latest_tick(&self) -> Option<u64> {
        self.paths.iter().map(|p| p.inserted_at_tick).max()
    }
}

impl PathCache {
    /// Captures every entry, oldest first.
    pub fn snapshot(&self) -> CacheSnapshot {
        let paths = self
            .iter_lru()
            .map(|entry| PersistedPath {
                origin_key: entry.origin_key.clone(),
                destination_key: entry.destination_key.clone(),
                value: entry.value.clone(),
                inserted_at_tick: entry.inserted_at_tick,
                ttl: Some(entry.ttl),
            })
            .collect();
        CacheSnapshot {
            paths,
            regions: Vec::new(),
        }
    }

    /// Re-inserts persisted entries in array order, keeping their original
    /// insertion tick. Entries already expired at `now` are skipped.
    ///
    /// Returns the number of entries restored.
    pub fn restore(&mut self, snapshot: &CacheSnapshot, now: u64) -> usize {
        let mut restored = 0;
        for record in &snapshot.paths {
            let ttl = record.ttl.unwrap_or_else(|| self.entry_ttl());
            if now.saturating_sub(record.inserted_at_tick) > ttl {
                continue;
            }
            self.set_cached_path(
                record.origin_key.clone(),
                record.destination_key.clone(),
                record.value.clone(),
                ttl,
                record.inserted_at_tick,
            );
            restored += 1;
        }
        restored
    }
}

/// A durable string key/value store.
pub trait SnapshotStore: Send + Sync {
    /// Returns `None` when nothing was stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as a JSON file in one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory.
    ///
    /// - Linux: ~/.local/share/colony-paths/
    /// - macOS: ~/Library/Application Support/colony-paths/
    /// - Windows: %APPDATA%/colony-paths/
    pub fn in_data_dir() -> Option<Self> {
        dirs::data_dir().map(|mut path| {
            path.push(STATE_DIR_NAME);
            Self::new(path)
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PathCacheError::Store(format!("unusable store key `{key}`")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // write-then-rename so a crash mid-write leaves the last snapshot intact
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-memory store, for tests and `--no-persist` runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The store the persistence systems write to.
#[derive(Resource)]
pub struct CacheStore(pub Box<dyn SnapshotStore>);

impl CacheStore {
    pub fn new(store: impl SnapshotStore + 'static) -> Self {
        Self(Box::new(store))
    }
}

/// Writes the cache under `key`. Returns the number of entries written.
pub fn save_cache(cache: &PathCache, store: &mut dyn SnapshotStore, key: &str) -> Result<usize> {
    let snapshot = cache.snapshot();
    store.write(key, &snapshot.to_json()?)?;
    Ok(snapshot.paths.len())
}

/// Reads and parses the snapshot stored under `key`, if any.
pub fn read_snapshot(store: &dyn SnapshotStore, key: &str) -> Result<Option<CacheSnapshot>> {
    store
        .read(key)?
        .map(|json| CacheSnapshot::from_json(&json))
        .transpose()
}
