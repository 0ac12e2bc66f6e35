use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::cost_matrix::DEFAULT_MATRIX_TTL;
use crate::error::{PathCacheError, Result};

/// Default number of cached paths.
pub const DEFAULT_CAPACITY: usize = 1000;
/// Default lifetime of a cached path, in ticks.
pub const DEFAULT_ENTRY_TTL: u64 = 1000;
/// Default number of ticks between snapshot writes.
pub const DEFAULT_PERSIST_INTERVAL: u64 = 50;
/// Default key of the snapshot in the durable store.
pub const DEFAULT_STORE_KEY: &str = "path_cache";

/// Tuning for the path cache and its persistence.
///
/// Read from an optional JSON file; any field left out keeps its default.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathCacheConfig {
    /// Maximum number of cached paths.
    pub capacity: usize,
    /// Ticks a path stays valid after insertion.
    pub entry_ttl: u64,
    /// Ticks a room's cost matrix stays valid after it is built.
    pub matrix_ttl: u64,
    /// Ticks between snapshot writes.
    pub persist_interval: u64,
    /// Key the snapshot is stored under.
    pub store_key: String,
}

impl Default for PathCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            entry_ttl: DEFAULT_ENTRY_TTL,
            matrix_ttl: DEFAULT_MATRIX_TTL,
            persist_interval: DEFAULT_PERSIST_INTERVAL,
            store_key: DEFAULT_STORE_KEY.to_string(),
        }
    }
}

impl PathCacheConfig {
    /// Rejects settings the cache cannot run with. Nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(PathCacheError::InvalidCapacity(self.capacity));
        }
        if self.persist_interval == 0 {
            return Err(PathCacheError::InvalidConfig {
                field: "persist_interval",
                reason: "must be at least 1 tick".to_string(),
            });
        }
        if self.matrix_ttl < self.entry_ttl {
            return Err(PathCacheError::InvalidConfig {
                field: "matrix_ttl",
                reason: format!(
                    "must not be shorter than entry_ttl ({} < {})",
                    self.matrix_ttl, self.entry_ttl
                ),
            });
        }
        if self.store_key.trim().is_empty() {
            return Err(PathCacheError::InvalidConfig {
                field: "store_key",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file, validating the result.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        info!("Loaded path cache config from {:?}", path);
        Ok(config)
    }
}
