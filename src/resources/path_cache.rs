//! Path result cache for colony navigation.
//!
//! Stores computed paths between positions to avoid re-running the expensive
//! search for journeys that dozens of units request every tick. Entries are
//! bounded by capacity (least-recently-used goes first) and by a per-entry
//! TTL that is only checked when the entry is read.

use bevy::prelude::*;
use std::collections::HashMap;

use super::cache_config::{PathCacheConfig, DEFAULT_ENTRY_TTL};
use super::cost_matrix::{CostMatrixCache, DEFAULT_MATRIX_TTL};
use crate::error::{PathCacheError, Result};
use crate::utils::lru_list::{LruList, NodeId, WALK_SLACK};
use crate::utils::pathfinding::{PathProvider, PathRequest, PathResult};
use crate::utils::position::{position_key, room_key_prefix, Position, RoomName};
use crate::utils::search_policy::SearchPolicy;

/// One cached path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub origin_key: String,
    pub destination_key: String,
    pub value: PathResult,
    /// Tick the entry was created.
    pub inserted_at_tick: u64,
    /// Ticks the entry stays valid.
    pub ttl: u64,
}

impl CacheEntry {
    /// Expiry is independent of recency: an entry may be expired yet MRU.
    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.inserted_at_tick) > self.ttl
    }
}

/// Counters exposed for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Maintained entry count.
    pub list_count: usize,
    /// Entry count from walking the list.
    pub size: usize,
    /// Rooms with a cached cost matrix.
    pub region_cache_size: usize,
}

/// Bounded, TTL-aware LRU cache of paths keyed by (origin, destination).
///
/// Owns the per-room cost matrix cache that providers consult on a miss.
#[derive(Resource, Debug)]
pub struct PathCache {
    list: LruList<CacheEntry>,
    /// origin key -> destination key -> node
    index: HashMap<String, HashMap<String, NodeId>>,
    capacity: usize,
    count: usize,
    entry_ttl: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    costs: CostMatrixCache,
}

impl PathCache {
    /// Creates a cache holding at most `capacity` paths.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PathCacheError::InvalidCapacity(capacity));
        }
        Ok(Self {
            list: LruList::with_capacity(capacity),
            index: HashMap::new(),
            capacity,
            count: 0,
            entry_ttl: DEFAULT_ENTRY_TTL,
            hits: 0,
            misses: 0,
            evictions: 0,
            costs: CostMatrixCache::new(DEFAULT_MATRIX_TTL),
        })
    }

    /// Creates a cache from validated configuration.
    pub fn from_config(config: &PathCacheConfig) -> Result<Self> {
        config.validate()?;
        let mut cache = Self::new(config.capacity)?;
        cache.entry_ttl = config.entry_ttl;
        cache.costs = CostMatrixCache::new(config.matrix_ttl);
        Ok(cache)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// TTL applied by [`PathCache::insert`].
    pub fn entry_ttl(&self) -> u64 {
        self.entry_ttl
    }

    /// Live entries, from the maintained counter.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Fraction of `get_path` calls served from cache.
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }

    pub fn costs(&self) -> &CostMatrixCache {
        &self.costs
    }

    /// Whether a key pair is indexed, expired or not.
    pub fn contains(&self, origin_key: &str, destination_key: &str) -> bool {
        self.lookup(origin_key, destination_key).is_some()
    }

    fn lookup(&self, origin_key: &str, destination_key: &str) -> Option<NodeId> {
        self.index.get(origin_key)?.get(destination_key).copied()
    }

    /// Looks up a cached path without touching recency.
    ///
    /// An expired entry is dropped on the spot and reads as a miss.
    pub fn get_cached_path(
        &mut self,
        origin_key: &str,
        destination_key: &str,
        now: u64,
    ) -> Option<&CacheEntry> {
        let id = self.lookup(origin_key, destination_key)?;
        let expired = self.list.get(id).map_or(true, |entry| entry.is_expired(now));
        if expired {
            if self.discard(id).is_none() {
                self.unindex(origin_key, destination_key);
            }
            return None;
        }
        self.list.get(id)
    }

    /// Marks a cached path as most recently used.
    pub fn promote(&mut self, origin_key: &str, destination_key: &str) -> bool {
        let Some(id) = self.lookup(origin_key, destination_key) else {
            return false;
        };
        match self.list.promote(id) {
            Ok(()) => true,
            Err(err) => {
                error!("Path cache: failed to promote {} -> {}: {}", origin_key, destination_key, err);
                false
            }
        }
    }

    /// Caches `value` with the default entry TTL.
    pub fn insert(
        &mut self,
        origin_key: impl Into<String>,
        destination_key: impl Into<String>,
        value: PathResult,
        now: u64,
    ) -> &CacheEntry {
        let ttl = self.entry_ttl;
        self.set_cached_path(origin_key, destination_key, value, ttl, now)
    }

    /// Caches `value` as the most-recently-used entry, evicting the
    /// least-recently-used one if that takes the cache over capacity.
    ///
    /// An existing entry for the same keys is replaced. A full cache makes
    /// room before linking, so the new entry is never the one evicted.
    pub fn set_cached_path(
        &mut self,
        origin_key: impl Into<String>,
        destination_key: impl Into<String>,
        value: PathResult,
        ttl: u64,
        now: u64,
    ) -> &CacheEntry {
        let origin_key = origin_key.into();
        let destination_key = destination_key.into();

        if let Some(existing) = self.lookup(&origin_key, &destination_key) {
            if self.discard(existing).is_none() {
                self.unindex(&origin_key, &destination_key);
            }
        }

        if self.count >= self.capacity {
            self.evict_lru();
        }

        let (id, entry) = self.list.push_mru(CacheEntry {
            origin_key: origin_key.clone(),
            destination_key: destination_key.clone(),
            value,
            inserted_at_tick: now,
            ttl,
        });
        self.index
            .entry(origin_key)
            .or_default()
            .insert(destination_key, id);
        self.count += 1;
        entry
    }

    /// Returns the path between two positions, computing it on a miss.
    ///
    /// The origin is keyed with range 0 and the destination with `range`, so
    /// the same journey at a different range is a different entry. While an
    /// entry is live, `provider` is not called again for the same keys.
    pub fn get_path<P: PathProvider + ?Sized>(
        &mut self,
        origin: &Position,
        destination: &Position,
        range: u32,
        policy: &SearchPolicy,
        provider: &mut P,
        now: u64,
    ) -> PathResult {
        let origin_key = position_key(origin, 0);
        let destination_key = position_key(destination, range);

        let cached = self
            .get_cached_path(&origin_key, &destination_key, now)
            .map(|entry| entry.value.clone());
        if let Some(value) = cached {
            self.promote(&origin_key, &destination_key);
            self.hits += 1;
            return value;
        }

        self.misses += 1;
        let request = PathRequest {
            origin: *origin,
            destination: *destination,
            range,
            policy,
            now,
        };
        let (result, stats) = provider.find_path(&request, &mut self.costs);
        debug!(
            "Path cache miss {} -> {} (range {}): {} steps, {} ops, {} rooms{}",
            origin,
            destination,
            range,
            result.len(),
            stats.ops,
            stats.rooms_opened,
            if result.incomplete { ", incomplete" } else { "" }
        );

        self.insert(origin_key, destination_key, result.clone(), now);
        result
    }

    /// Drops one cached path. Returns true if it was present.
    pub fn invalidate(&mut self, origin_key: &str, destination_key: &str) -> bool {
        match self.lookup(origin_key, destination_key) {
            Some(id) => {
                if self.discard(id).is_none() {
                    self.unindex(origin_key, destination_key);
                }
                true
            }
            None => false,
        }
    }

    /// Drops every path starting or ending in `room`, plus its cost matrix.
    /// Returns the number of paths dropped.
    pub fn invalidate_room(&mut self, room: RoomName) -> usize {
        let prefix = room_key_prefix(room);
        let doomed: Vec<NodeId> = self
            .list
            .iter_lru()
            .filter(|(_, e)| e.origin_key.starts_with(&prefix) || e.destination_key.starts_with(&prefix))
            .map(|(id, _)| id)
            .collect();

        let dropped = doomed
            .into_iter()
            .filter(|&id| self.discard(id).is_some())
            .count();
        self.costs.invalidate(room);
        if dropped > 0 {
            debug!("Path cache: invalidated {} paths touching {}", dropped, room);
        }
        dropped
    }

    /// Drops every cached path. Cost matrices are kept.
    pub fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
        self.count = 0;
    }

    /// Entries from least- to most-recently used.
    pub fn iter_lru(&self) -> impl Iterator<Item = &CacheEntry> + '_ {
        self.list.iter_lru().map(|(_, entry)| entry)
    }

    /// Counts entries by walking the list; for diagnostics, not the hot path.
    pub fn size(&self) -> usize {
        self.list.walk_len(self.capacity + WALK_SLACK).count
    }

    pub fn stats(&self) -> PathCacheStats {
        PathCacheStats {
            hits: self.hits,
            misses: self.misses,
            list_count: self.count,
            size: self.size(),
            region_cache_size: self.costs.len(),
        }
    }

    fn evict_lru(&mut self) {
        let Some(id) = self.list.lru() else {
            return;
        };
        if let Some(entry) = self.discard(id) {
            self.evictions += 1;
            trace!(
                "Path cache: evicted {} -> {}",
                entry.origin_key,
                entry.destination_key
            );
        }
    }

    /// Unlinks a node and removes its index entry.
    fn discard(&mut self, id: NodeId) -> Option<CacheEntry> {
        match self.list.remove(id) {
            Ok(entry) => {
                self.unindex(&entry.origin_key, &entry.destination_key);
                self.count = self.count.saturating_sub(1);
                Some(entry)
            }
            Err(err) => {
                error!("Path cache: failed to drop node {}: {}", id, err);
                None
            }
        }
    }

    fn unindex(&mut self, origin_key: &str, destination_key: &str) {
        if let Some(destinations) = self.index.get_mut(origin_key) {
            destinations.remove(destination_key);
            if destinations.is_empty() {
                self.index.remove(origin_key);
            }
        }
    }

    /// Index and list agree on every entry.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let indexed: usize = self.index.values().map(|d| d.len()).sum();
        let walked = self.list.walk_len(self.capacity + WALK_SLACK);
        let all_indexed_linked = self.index.iter().all(|(origin, destinations)| {
            destinations.iter().all(|(destination, &id)| {
                self.list.is_linked(id)
                    && self
                        .list
                        .get(id)
                        .is_some_and(|e| &e.origin_key == origin && &e.destination_key == destination)
            })
        });
        !walked.corrupted && walked.count == self.count && indexed == self.count && all_indexed_linked
    }
}
