//! Per-room traversal cost matrices and their cache.
//!
//! A matrix only records what structures change about a room: roads make a
//! tile cheaper, anything a unit can't stand on makes it impassable. Tiles left
//! at 0 fall back to the terrain cost during the search.

use bevy::prelude::*;
use std::collections::HashMap;

use super::room_map::{Structure, StructureKind, WorldView};
use crate::utils::position::{RoomName, ROOM_SIZE};

/// Cost of an impassable tile.
pub const BLOCKED: u8 = 255;
/// Cost of a tile with a road on it.
pub const ROAD_COST: u8 = 1;
/// Structures change rarely, so matrices live much longer than paths.
pub const DEFAULT_MATRIX_TTL: u64 = 10_000;

const TILES_PER_ROOM: usize = (ROOM_SIZE * ROOM_SIZE) as usize;

/// Movement cost per tile of a single room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CostMatrix {
    costs: Vec<u8>,
}

impl Default for CostMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl CostMatrix {
    /// An empty matrix: every tile defers to terrain.
    pub fn new() -> Self {
        Self {
            costs: vec![0; TILES_PER_ROOM],
        }
    }

    /// A matrix with every tile impassable.
    pub fn blocked() -> Self {
        Self {
            costs: vec![BLOCKED; TILES_PER_ROOM],
        }
    }

    /// Builds the matrix for a room from its visible structures.
    ///
    /// Blocking wins over roads regardless of structure order.
    pub fn from_structures(structures: &[Structure]) -> Self {
        let mut matrix = Self::new();
        for structure in structures {
            if structure.kind == StructureKind::Road {
                if matrix.get(structure.x, structure.y) == 0 {
                    matrix.set(structure.x, structure.y, ROAD_COST);
                }
            } else if !structure.is_walkable() {
                matrix.set(structure.x, structure.y, BLOCKED);
            }
        }
        matrix
    }

    pub fn get(&self, x: u8, y: u8) -> u8 {
        Self::index(x, y).map_or(BLOCKED, |i| self.costs[i])
    }

    pub fn set(&mut self, x: u8, y: u8, cost: u8) {
        if let Some(i) = Self::index(x, y) {
            self.costs[i] = cost;
        }
    }

    /// True when no tile overrides terrain.
    pub fn is_empty(&self) -> bool {
        self.costs.iter().all(|&c| c == 0)
    }

    fn index(x: u8, y: u8) -> Option<usize> {
        ((x as i32) < ROOM_SIZE && (y as i32) < ROOM_SIZE)
            .then(|| y as usize * ROOM_SIZE as usize + x as usize)
    }
}

#[derive(Clone, Debug)]
struct CachedMatrix {
    matrix: CostMatrix,
    built_at: u64,
}

/// Lazily builds and caches one cost matrix per room.
#[derive(Debug, Clone)]
pub struct CostMatrixCache {
    matrices: HashMap<RoomName, CachedMatrix>,
    matrix_ttl: u64,
    empty: CostMatrix,
    builds: u64,
}

impl Default for CostMatrixCache {
    fn default() -> Self {
        Self::new(DEFAULT_MATRIX_TTL)
    }
}

impl CostMatrixCache {
    pub fn new(matrix_ttl: u64) -> Self {
        Self {
            matrices: HashMap::new(),
            matrix_ttl,
            empty: CostMatrix::new(),
            builds: 0,
        }
    }

    /// Returns the room's matrix, rebuilding it once it is older than the TTL.
    ///
    /// Rooms we have never seen get an empty matrix, which is not cached so
    /// the first visible tick builds a real one. A stale matrix for a room
    /// that is no longer visible is kept as the best information available.
    pub fn matrix_for(&mut self, room: RoomName, view: &dyn WorldView, now: u64) -> &CostMatrix {
        let fresh = self
            .matrices
            .get(&room)
            .is_some_and(|cached| now.saturating_sub(cached.built_at) <= self.matrix_ttl);

        if !fresh {
            if let Some(structures) = view.structures(room) {
                trace!("Building cost matrix for {} at tick {}", room, now);
                self.matrices.insert(
                    room,
                    CachedMatrix {
                        matrix: CostMatrix::from_structures(structures),
                        built_at: now,
                    },
                );
                self.builds += 1;
            }
        }

        self.matrices
            .get(&room)
            .map_or(&self.empty, |cached| &cached.matrix)
    }

    /// Tick the cached matrix for `room` was built, if any.
    pub fn built_at(&self, room: RoomName) -> Option<u64> {
        self.matrices.get(&room).map(|c| c.built_at)
    }

    /// Forces the next lookup for `room` to rebuild.
    pub fn invalidate(&mut self, room: RoomName) -> bool {
        self.matrices.remove(&room).is_some()
    }

    pub fn clear(&mut self) {
        self.matrices.clear();
    }

    /// Number of rooms with a cached matrix.
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Total matrix builds since creation.
    pub fn builds(&self) -> u64 {
        self.builds
    }
}
