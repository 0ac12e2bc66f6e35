//! Procedural generation of the colony's surroundings.
//!
//! Uses the `noise` crate to lay natural-looking walls and swamps across a
//! grid of rooms, then places the home spawn, its roads and the work sites
//! workers commute to.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rand::prelude::*;

use crate::resources::room_intel::RoomIntel;
use crate::resources::room_map::{RoomData, RoomMap, RoomTerrain, Structure, StructureKind, Terrain};
use crate::utils::position::{Position, RoomName, ROOM_SIZE};
use crate::utils::search_policy::{Ownership, RoomStatus};

/// Configuration for procedural world generation.
#[derive(Clone, Debug)]
pub struct ColonyGenConfig {
    /// Random seed for reproducible generation
    pub seed: u32,
    /// Rooms east of the home room, inclusive of it
    pub rooms_wide: i32,
    /// Rooms south of the home room, inclusive of it
    pub rooms_high: i32,
    /// Noise frequency (lower = larger wall masses)
    pub frequency: f64,
    /// Number of noise octaves for detail
    pub octaves: usize,
    /// Minimum number of work sites
    pub min_sites: usize,
    /// Maximum number of work sites
    pub max_sites: usize,
    /// Chance that a non-home room is held by a rival
    pub rival_chance: f64,
}

impl Default for ColonyGenConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            rooms_wide: 3,
            rooms_high: 3,
            frequency: 0.06,
            octaves: 4,
            min_sites: 4,
            max_sites: 8,
            rival_chance: 0.2,
        }
    }
}

/// The generated world plus the landmarks the colony is built around.
pub struct GeneratedColony {
    pub map: RoomMap,
    pub intel: RoomIntel,
    pub home: RoomName,
    pub spawn: Position,
    pub sites: Vec<Position>,
}

/// The home room always sits at the world origin.
pub const HOME_ROOM: RoomName = RoomName::new(0, 0);

const SPAWN_X: u8 = 25;
const SPAWN_Y: u8 = 25;
/// Radius around the spawn that is always clear terrain.
const CLEARING_RADIUS: i32 = 4;
/// Minimum Chebyshev distance between two work sites.
const MIN_SITE_SPACING: u32 = 6;

/// Generates a world of `rooms_wide * rooms_high` rooms.
///
/// The generation process:
/// 1. Fbm noise over global tile coordinates, so terrain is seamless across rooms
/// 2. Clearing around the home spawn
/// 3. Spawn, controller and a road spine in the home room
/// 4. Work sites on walkable tiles, spaced apart
/// 5. Intel for every room; only the home room and its neighbours are visible
pub fn generate_colony(config: &ColonyGenConfig) -> GeneratedColony {
    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed as u64);
    let fbm: Fbm<Perlin> = Fbm::new(config.seed)
        .set_frequency(config.frequency)
        .set_octaves(config.octaves);

    let mut map = RoomMap::new();
    let mut intel = RoomIntel::default();

    for ry in 0..config.rooms_high.max(1) {
        for rx in 0..config.rooms_wide.max(1) {
            let room = HOME_ROOM.offset(rx, ry);
            let mut terrain = generate_terrain(&fbm, room);
            if room == HOME_ROOM {
                clear_spawn_area(&mut terrain);
            }

            let visible = room.distance(HOME_ROOM) <= 1;
            let structures = if room == HOME_ROOM {
                Some(home_structures(&terrain))
            } else if visible {
                Some(Vec::new())
            } else {
                None
            };

            let owner = if room == HOME_ROOM {
                Ownership::Mine
            } else if rng.gen_bool(config.rival_chance.clamp(0.0, 1.0)) {
                Ownership::Foreign("rival".to_string())
            } else {
                Ownership::Unowned
            };
            let has_towers = matches!(owner, Ownership::Foreign(_)) && rng.gen_bool(0.5);
            intel.record(
                room,
                RoomStatus {
                    owner,
                    has_towers,
                    ..Default::default()
                },
                0,
            );

            map.insert(
                room,
                RoomData {
                    terrain,
                    structures,
                    creeps: Vec::new(),
                },
            );
        }
    }

    let spawn = Position::new(SPAWN_X, SPAWN_Y, HOME_ROOM);
    let sites = place_sites(&map, config, &mut rng);

    bevy::log::info!(
        "Generated colony: {} rooms, {} work sites, seed: {}",
        map.len(),
        sites.len(),
        config.seed
    );

    GeneratedColony {
        map,
        intel,
        home: HOME_ROOM,
        spawn,
        sites,
    }
}

fn generate_terrain(fbm: &Fbm<Perlin>, room: RoomName) -> RoomTerrain {
    let mut terrain = RoomTerrain::default();
    for y in 0..ROOM_SIZE as u8 {
        for x in 0..ROOM_SIZE as u8 {
            let (gx, gy) = Position::new(x, y, room).global();
            let value = fbm.get([gx as f64, gy as f64]);
            terrain.set(x, y, noise_to_terrain(value));
        }
    }
    terrain
}

/// Maps a noise value to terrain.
/// Thresholds are tuned for roughly one tile in six being a wall.
fn noise_to_terrain(value: f64) -> Terrain {
    if value > 0.35 {
        Terrain::Wall
    } else if value > 0.2 {
        Terrain::Swamp
    } else {
        Terrain::Plain
    }
}

fn clear_spawn_area(terrain: &mut RoomTerrain) {
    for dy in -CLEARING_RADIUS..=CLEARING_RADIUS {
        for dx in -CLEARING_RADIUS..=CLEARING_RADIUS {
            let x = (SPAWN_X as i32 + dx) as u8;
            let y = (SPAWN_Y as i32 + dy) as u8;
            terrain.set(x, y, Terrain::Plain);
        }
    }
}

/// Spawn, controller and a horizontal road through the spawn row.
fn home_structures(terrain: &RoomTerrain) -> Vec<Structure> {
    let mut structures = vec![
        Structure::owned(StructureKind::Spawn, SPAWN_X, SPAWN_Y),
        Structure::owned(StructureKind::Controller, SPAWN_X, SPAWN_Y - 3),
    ];
    let road_y = SPAWN_Y + 1;
    structures.extend(
        (2..ROOM_SIZE as u8 - 2)
            .filter(|&x| terrain.get(x, road_y) != Terrain::Wall)
            .map(|x| Structure::new(StructureKind::Road, x, road_y)),
    );
    structures
}

/// Picks spaced-out walkable tiles away from room edges.
fn place_sites(map: &RoomMap, config: &ColonyGenConfig, rng: &mut StdRng) -> Vec<Position> {
    let mut candidates: Vec<Position> = map
        .room_names()
        .flat_map(|room| {
            (2..ROOM_SIZE as u8 - 2)
                .step_by(3)
                .flat_map(move |y| (2..ROOM_SIZE as u8 - 2).step_by(3).map(move |x| Position::new(x, y, room)))
        })
        .filter(|pos| map.is_walkable(pos))
        .collect();

    if candidates.is_empty() {
        bevy::log::warn!("No valid work site locations found!");
        return Vec::new();
    }

    // HashMap iteration order is random; sort before shuffling for reproducibility
    candidates.sort_by_key(|p| (p.room, p.y, p.x));
    candidates.shuffle(rng);

    let max_sites = config.max_sites.max(config.min_sites);
    let wanted = rng.gen_range(config.min_sites..=max_sites);
    let spawn = Position::new(SPAWN_X, SPAWN_Y, HOME_ROOM);

    let mut sites: Vec<Position> = Vec::with_capacity(wanted);
    for pos in candidates {
        if sites.len() >= wanted {
            break;
        }
        let too_close = pos.range_to(&spawn) < MIN_SITE_SPACING
            || sites.iter().any(|s| s.range_to(&pos) < MIN_SITE_SPACING);
        if !too_close {
            sites.push(pos);
        }
    }
    sites
}
