use bevy::prelude::*;
use std::collections::HashMap;

use crate::utils::position::{Position, RoomName, ROOM_SIZE};

const TILES_PER_ROOM: usize = (ROOM_SIZE * ROOM_SIZE) as usize;

/// Natural terrain of a single tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Terrain {
    #[default]
    Plain,
    Swamp,
    Wall,
}

impl Terrain {
    /// Movement cost used when the cost matrix leaves a tile at 0.
    /// Returns `None` for impassable terrain.
    pub fn move_cost(&self) -> Option<u32> {
        match self {
            Terrain::Plain => Some(2),
            Terrain::Swamp => Some(10),
            Terrain::Wall => None,
        }
    }
}

/// Terrain of one room, stored row-major (y * ROOM_SIZE + x).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomTerrain {
    tiles: Vec<Terrain>,
}

impl Default for RoomTerrain {
    fn default() -> Self {
        Self {
            tiles: vec![Terrain::Plain; TILES_PER_ROOM],
        }
    }
}

impl RoomTerrain {
    /// Terrain at the given tile. Out-of-room coordinates read as walls.
    pub fn get(&self, x: u8, y: u8) -> Terrain {
        if (x as i32) < ROOM_SIZE && (y as i32) < ROOM_SIZE {
            self.tiles[y as usize * ROOM_SIZE as usize + x as usize]
        } else {
            Terrain::Wall
        }
    }

    /// Sets the terrain at the given tile.
    /// Returns true if successful, false if out of bounds.
    pub fn set(&mut self, x: u8, y: u8, terrain: Terrain) -> bool {
        if (x as i32) < ROOM_SIZE && (y as i32) < ROOM_SIZE {
            self.tiles[y as usize * ROOM_SIZE as usize + x as usize] = terrain;
            true
        } else {
            false
        }
    }

    /// Returns an iterator over all tiles with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u8, Terrain)> + '_ {
        self.tiles.iter().enumerate().map(|(i, t)| {
            ((i % ROOM_SIZE as usize) as u8, (i / ROOM_SIZE as usize) as u8, *t)
        })
    }
}

/// Kinds of structure that can occupy a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StructureKind {
    Road,
    Container,
    Rampart,
    ConstructedWall,
    Spawn,
    Extension,
    Tower,
    Storage,
    Link,
    Terminal,
    Controller,
    KeeperLair,
}

/// A structure seen in a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Structure {
    pub kind: StructureKind,
    pub x: u8,
    pub y: u8,
    /// Whether we own it.
    pub my: bool,
}

impl Structure {
    pub fn new(kind: StructureKind, x: u8, y: u8) -> Self {
        Self { kind, x, y, my: false }
    }

    pub fn owned(kind: StructureKind, x: u8, y: u8) -> Self {
        Self { kind, x, y, my: true }
    }

    /// Units may stand on roads, containers and our own ramparts.
    pub fn is_walkable(&self) -> bool {
        match self.kind {
            StructureKind::Road | StructureKind::Container => true,
            StructureKind::Rampart => self.my,
            _ => false,
        }
    }
}

/// What the colony can currently see of the world.
pub trait WorldView {
    /// Terrain of a room, if the room exists on the map.
    fn terrain(&self, room: RoomName) -> Option<&RoomTerrain>;

    /// Structures of a room; `None` while we have no vision there.
    fn structures(&self, room: RoomName) -> Option<&[Structure]>;

    /// Tiles currently occupied by units in a visible room.
    fn creeps(&self, room: RoomName) -> &[Position];
}

/// Everything known about one room.
#[derive(Clone, Debug, Default)]
pub struct RoomData {
    pub terrain: RoomTerrain,
    /// `None` until the room has been seen.
    pub structures: Option<Vec<Structure>>,
    pub creeps: Vec<Position>,
}

/// Resource holding the rooms of the world map.
///
/// This is the source of truth for terrain and structures and is read by:
/// - `CostMatrixCache` when (re)building traversal costs
/// - `GridSearch` for terrain costs and unit positions
#[derive(Resource, Default, Debug)]
pub struct RoomMap {
    rooms: HashMap<RoomName, RoomData>,
}

impl RoomMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, room: RoomName, data: RoomData) {
        self.rooms.insert(room, data);
    }

    pub fn room(&self, room: RoomName) -> Option<&RoomData> {
        self.rooms.get(&room)
    }

    pub fn room_mut(&mut self, room: RoomName) -> Option<&mut RoomData> {
        self.rooms.get_mut(&room)
    }

    /// Records a structure, marking the room as visible.
    /// Returns false if the room is unknown.
    pub fn add_structure(&mut self, room: RoomName, structure: Structure) -> bool {
        match self.rooms.get_mut(&room) {
            Some(data) => {
                data.structures.get_or_insert_with(Vec::new).push(structure);
                true
            }
            None => false,
        }
    }

    pub fn room_names(&self) -> impl Iterator<Item = RoomName> + '_ {
        self.rooms.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Whether a unit could stand on `pos` ignoring other units.
    pub fn is_walkable(&self, pos: &Position) -> bool {
        let Some(data) = self.rooms.get(&pos.room) else {
            return false;
        };
        if data.terrain.get(pos.x, pos.y) == Terrain::Wall {
            return false;
        }
        data.structures.as_deref().map_or(true, |structures| {
            structures
                .iter()
                .filter(|s| s.x == pos.x && s.y == pos.y)
                .all(Structure::is_walkable)
        })
    }
}

impl WorldView for RoomMap {
    fn terrain(&self, room: RoomName) -> Option<&RoomTerrain> {
        self.rooms.get(&room).map(|d| &d.terrain)
    }

    fn structures(&self, room: RoomName) -> Option<&[Structure]> {
        self.rooms.get(&room).and_then(|d| d.structures.as_deref())
    }

    fn creeps(&self, room: RoomName) -> &[Position] {
        self.rooms.get(&room).map_or(&[], |d| d.creeps.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_out_of_bounds_is_wall() {
        let terrain = RoomTerrain::default();
        assert_eq!(terrain.get(10, 10), Terrain::Plain);
        assert_eq!(terrain.get(50, 10), Terrain::Wall);
    }

    #[test]
    fn test_structure_walkability() {
        assert!(Structure::new(StructureKind::Road, 1, 1).is_walkable());
        assert!(Structure::new(StructureKind::Container, 1, 1).is_walkable());
        assert!(Structure::owned(StructureKind::Rampart, 1, 1).is_walkable());
        assert!(!Structure::new(StructureKind::Rampart, 1, 1).is_walkable());
        assert!(!Structure::owned(StructureKind::Spawn, 1, 1).is_walkable());
    }

    #[test]
    fn test_visibility_follows_structures() {
        let room = RoomName::new(0, 0);
        let mut map = RoomMap::new();
        map.insert(room, RoomData::default());
        assert!(map.structures(room).is_none());

        assert!(map.add_structure(room, Structure::new(StructureKind::Road, 5, 5)));
        assert_eq!(map.structures(room).map(|s| s.len()), Some(1));
        assert!(!map.add_structure(RoomName::new(9, 9), Structure::new(StructureKind::Road, 5, 5)));
    }

    #[test]
    fn test_is_walkable() {
        let room = RoomName::new(0, 0);
        let mut map = RoomMap::new();
        let mut data = RoomData::default();
        data.terrain.set(3, 3, Terrain::Wall);
        map.insert(room, data);
        map.add_structure(room, Structure::new(StructureKind::Tower, 4, 4));
        map.add_structure(room, Structure::new(StructureKind::Road, 5, 5));

        assert!(!map.is_walkable(&Position::new(3, 3, room)));
        assert!(!map.is_walkable(&Position::new(4, 4, room)));
        assert!(map.is_walkable(&Position::new(5, 5, room)));
        assert!(!map.is_walkable(&Position::new(5, 5, RoomName::new(1, 0))));
    }
}
