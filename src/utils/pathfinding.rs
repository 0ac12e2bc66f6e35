//! Path provider contract and the weighted A* search used by the colony.
//!
//! The search runs on the seamless global tile grid so that paths may cross
//! room borders. Each room it touches gets either a fully blocked matrix (per
//! the room status oracle and the search policy) or its cached traversal
//! matrix, falling back to terrain costs where the matrix is 0.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::position::{Position, RoomName};
use super::search_policy::{RoomStatusOracle, SearchPolicy};
use crate::resources::cost_matrix::{CostMatrix, CostMatrixCache, BLOCKED};
use crate::resources::room_map::WorldView;

/// Cost per tile the heuristic assumes; plain terrain.
const HEURISTIC_COST: u32 = 2;

/// A computed path: every step after the origin, ending in range of the target.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathResult {
    pub path: Vec<Position>,
    /// Nodes expanded to find it.
    #[serde(default)]
    pub ops: u32,
    /// Summed movement cost of the path.
    #[serde(default)]
    pub cost: u32,
    /// True when the path does not reach the destination.
    #[serde(default)]
    pub incomplete: bool,
}

impl PathResult {
    /// A "no path" result. Cached like any other so known-unreachable targets
    /// are not searched again until the entry expires.
    pub fn unreachable(ops: u32) -> Self {
        Self {
            path: Vec::new(),
            ops,
            cost: 0,
            incomplete: true,
        }
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Final tile of the path, if it has any steps.
    pub fn end(&self) -> Option<&Position> {
        self.path.last()
    }
}

/// Diagnostics reported alongside a path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub ops: u32,
    /// Rooms the search opened and costed.
    pub rooms_opened: u32,
    /// Rooms rejected by the avoidance rules or the room limit.
    pub rooms_blocked: u32,
}

/// Everything a provider needs to answer one request.
#[derive(Clone, Copy, Debug)]
pub struct PathRequest<'a> {
    pub origin: Position,
    pub destination: Position,
    /// The path ends once within this many tiles of `destination`.
    pub range: u32,
    pub policy: &'a SearchPolicy,
    pub now: u64,
}

/// The expensive computation the path cache wraps.
pub trait PathProvider {
    fn find_path(
        &mut self,
        request: &PathRequest<'_>,
        costs: &mut CostMatrixCache,
    ) -> (PathResult, SearchStats);
}

impl<F> PathProvider for F
where
    F: FnMut(&PathRequest<'_>, &mut CostMatrixCache) -> (PathResult, SearchStats),
{
    fn find_path(
        &mut self,
        request: &PathRequest<'_>,
        costs: &mut CostMatrixCache,
    ) -> (PathResult, SearchStats) {
        self(request, costs)
    }
}

/// A node in the open set.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Node {
    pos: (i32, i32),
    cost: u32,     // g: cost from start
    priority: u32, // f: g + h
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap; prefer deeper nodes on ties
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.cost.cmp(&other.cost))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Weighted A* over terrain, cost matrices and room intel.
pub struct GridSearch<'a> {
    view: &'a dyn WorldView,
    oracle: &'a dyn RoomStatusOracle,
}

impl<'a> GridSearch<'a> {
    pub fn new(view: &'a dyn WorldView, oracle: &'a dyn RoomStatusOracle) -> Self {
        Self { view, oracle }
    }

    /// Resolves how a room is costed, opening it on first touch.
    fn open_room(
        &self,
        room: RoomName,
        request: &PathRequest<'_>,
        costs: &mut CostMatrixCache,
        stats: &mut SearchStats,
    ) -> CostMatrix {
        let policy = request.policy;
        let avoid = policy.should_avoid(
            room,
            request.origin.room,
            request.destination.room,
            self.oracle,
            request.now,
        );
        if avoid || stats.rooms_opened >= policy.max_rooms {
            stats.rooms_blocked += 1;
            return CostMatrix::blocked();
        }

        stats.rooms_opened += 1;
        let mut matrix = costs.matrix_for(room, self.view, request.now).clone();
        if !policy.ignore_creeps {
            for creep in self.view.creeps(room) {
                if *creep != request.destination {
                    matrix.set(creep.x, creep.y, BLOCKED);
                }
            }
        }
        matrix
    }

    /// Movement cost of stepping onto `pos`, or `None` if impassable.
    fn tile_cost(&self, pos: &Position, rooms: &HashMap<RoomName, CostMatrix>) -> Option<u32> {
        match rooms.get(&pos.room)?.get(pos.x, pos.y) {
            BLOCKED => None,
            0 => match self.view.terrain(pos.room) {
                Some(terrain) => terrain.get(pos.x, pos.y).move_cost(),
                None => Some(HEURISTIC_COST),
            },
            cost => Some(cost as u32),
        }
    }

    fn search(
        &self,
        request: &PathRequest<'_>,
        costs: &mut CostMatrixCache,
    ) -> (PathResult, SearchStats) {
        let mut stats = SearchStats::default();
        let policy = request.policy;
        let goal = request.destination;
        let start = request.origin.global();

        let distance = |g: (i32, i32)| -> u32 {
            Position::from_global(g.0, g.1)
                .range_to(&goal)
                .saturating_sub(request.range)
        };

        if distance(start) == 0 {
            return (PathResult::default(), stats);
        }

        let mut rooms: HashMap<RoomName, CostMatrix> = HashMap::new();
        let origin_costs = self.open_room(request.origin.room, request, costs, &mut stats);
        rooms.insert(request.origin.room, origin_costs);

        let mut open_set = BinaryHeap::new();
        let mut came_from: HashMap<(i32, i32), (i32, i32)> = HashMap::new();
        let mut g_score: HashMap<(i32, i32), u32> = HashMap::new();
        let mut closed_set: HashSet<(i32, i32)> = HashSet::new();

        g_score.insert(start, 0);
        open_set.push(Node {
            pos: start,
            cost: 0,
            priority: distance(start) * HEURISTIC_COST,
        });

        // Closest tile reached so far, for incomplete results.
        let mut best = (start, distance(start), 0u32);
        let mut reached = None;

        while let Some(current) = open_set.pop() {
            if !closed_set.insert(current.pos) {
                continue;
            }
            if stats.ops >= policy.max_ops {
                debug!(
                    "Search {} -> {} hit its op limit ({})",
                    request.origin, goal, policy.max_ops
                );
                break;
            }
            stats.ops += 1;

            let h = distance(current.pos);
            if h == 0 {
                reached = Some(current.pos);
                break;
            }
            if h < best.1 || (h == best.1 && current.cost < best.2) {
                best = (current.pos, h, current.cost);
            }

            for (dx, dy) in NEIGHBOR_OFFSETS {
                let next = (current.pos.0 + dx, current.pos.1 + dy);
                if closed_set.contains(&next) {
                    continue;
                }
                let next_pos = Position::from_global(next.0, next.1);
                if !rooms.contains_key(&next_pos.room) {
                    let opened = self.open_room(next_pos.room, request, costs, &mut stats);
                    rooms.insert(next_pos.room, opened);
                }
                let Some(step) = self.tile_cost(&next_pos, &rooms) else {
                    continue;
                };

                let new_g = current.cost + step;
                if new_g < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                    came_from.insert(next, current.pos);
                    g_score.insert(next, new_g);
                    open_set.push(Node {
                        pos: next,
                        cost: new_g,
                        priority: new_g + distance(next) * HEURISTIC_COST,
                    });
                }
            }
        }

        let (end, incomplete) = match reached {
            Some(end) => (end, false),
            None if policy.allow_incomplete => (best.0, true),
            None => return (PathResult::unreachable(stats.ops), stats),
        };

        let mut path = reconstruct_path(&came_from, end);
        let mut incomplete = incomplete;
        if let Some(limit) = policy.max_path_length {
            if path.len() > limit as usize {
                path.truncate(limit as usize);
                incomplete = true;
            }
        }
        let cost = path
            .last()
            .and_then(|end| g_score.get(end).copied())
            .unwrap_or(0);

        let result = PathResult {
            path: path
                .into_iter()
                .map(|(gx, gy)| Position::from_global(gx, gy))
                .collect(),
            ops: stats.ops,
            cost,
            incomplete,
        };
        (result, stats)
    }
}

impl PathProvider for GridSearch<'_> {
    fn find_path(
        &mut self,
        request: &PathRequest<'_>,
        costs: &mut CostMatrixCache,
    ) -> (PathResult, SearchStats) {
        self.search(request, costs)
    }
}

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

/// Walks `came_from` back to the start; the start tile itself is excluded.
fn reconstruct_path(
    came_from: &HashMap<(i32, i32), (i32, i32)>,
    mut current: (i32, i32),
) -> Vec<(i32, i32)> {
    let mut path = Vec::new();
    while let Some(&prev) = came_from.get(&current) {
        path.push(current);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::room_map::{RoomData, RoomMap, Structure, StructureKind, Terrain};
    use crate::utils::search_policy::{Ownership, RoomStatus};

    #[derive(Default)]
    struct Intel(HashMap<RoomName, RoomStatus>);

    impl RoomStatusOracle for Intel {
        fn status(&self, room: RoomName) -> Option<&RoomStatus> {
            self.0.get(&room)
        }

        fn is_stale(&self, _room: RoomName, _now: u64) -> bool {
            false
        }
    }

    const HOME: RoomName = RoomName::new(0, 0);
    const EAST: RoomName = RoomName::new(1, 0);

    fn open_map(rooms: &[RoomName]) -> RoomMap {
        let mut map = RoomMap::new();
        for room in rooms {
            map.insert(
                *room,
                RoomData {
                    structures: Some(Vec::new()),
                    ..Default::default()
                },
            );
        }
        map
    }

    fn request<'a>(from: Position, to: Position, range: u32, policy: &'a SearchPolicy) -> PathRequest<'a> {
        PathRequest {
            origin: from,
            destination: to,
            range,
            policy,
            now: 1,
        }
    }

    #[test]
    fn test_straight_path() {
        let map = open_map(&[HOME]);
        let intel = Intel::default();
        let mut costs = CostMatrixCache::default();
        let policy = SearchPolicy::default();
        let from = Position::new(10, 10, HOME);
        let to = Position::new(15, 10, HOME);

        let (result, stats) = GridSearch::new(&map, &intel).find_path(&request(from, to, 0, &policy), &mut costs);
        assert!(!result.incomplete);
        assert_eq!(result.len(), 5);
        assert_eq!(result.end(), Some(&to));
        assert_eq!(result.cost, 10);
        assert!(stats.ops > 0);
        assert_eq!(stats.rooms_opened, 1);
    }

    #[test]
    fn test_range_stops_early() {
        let map = open_map(&[HOME]);
        let intel = Intel::default();
        let mut costs = CostMatrixCache::default();
        let policy = SearchPolicy::default();
        let from = Position::new(10, 10, HOME);
        let to = Position::new(20, 10, HOME);

        let (result, _) = GridSearch::new(&map, &intel).find_path(&request(from, to, 3, &policy), &mut costs);
        assert_eq!(result.len(), 7);
        assert_eq!(result.end().map(|p| p.range_to(&to)), Some(3));
    }

    #[test]
    fn test_already_in_range() {
        let map = open_map(&[HOME]);
        let intel = Intel::default();
        let mut costs = CostMatrixCache::default();
        let policy = SearchPolicy::default();
        let from = Position::new(10, 10, HOME);

        let (result, stats) = GridSearch::new(&map, &intel)
            .find_path(&request(from, Position::new(11, 11, HOME), 1, &policy), &mut costs);
        assert!(result.is_empty());
        assert!(!result.incomplete);
        assert_eq!(stats.ops, 0);
    }

    #[test]
    fn test_prefers_roads() {
        let mut map = open_map(&[HOME]);
        // detour road one row below the direct line is cheaper than plain tiles
        for x in 10..=20 {
            map.add_structure(HOME, Structure::new(StructureKind::Road, x, 11));
        }
        let intel = Intel::default();
        let mut costs = CostMatrixCache::default();
        let policy = SearchPolicy::default();
        let from = Position::new(10, 10, HOME);
        let to = Position::new(20, 10, HOME);

        let (result, _) = GridSearch::new(&map, &intel).find_path(&request(from, to, 0, &policy), &mut costs);
        assert!(!result.incomplete);
        assert!(result.path.iter().filter(|p| p.y == 11).count() >= 8);
        assert!(result.cost < 20);
    }

    #[test]
    fn test_walls_and_structures_block() {
        let mut map = open_map(&[HOME]);
        if let Some(room) = map.room_mut(HOME) {
            for y in 0..50 {
                if y != 40 {
                    room.terrain.set(12, y, Terrain::Wall);
                }
            }
        }
        let intel = Intel::default();
        let mut costs = CostMatrixCache::default();
        let policy = SearchPolicy::local().with_max_ops(20_000);
        let from = Position::new(10, 10, HOME);
        let to = Position::new(14, 10, HOME);

        let (result, _) = GridSearch::new(&map, &intel).find_path(&request(from, to, 0, &policy), &mut costs);
        assert!(!result.incomplete);
        assert!(result.path.iter().any(|p| p.x == 12 && p.y == 40));

        map.add_structure(HOME, Structure::new(StructureKind::ConstructedWall, 12, 40));
        let mut costs = CostMatrixCache::default();
        let strict = policy.clone().with_incomplete(false);
        let (blocked, _) = GridSearch::new(&map, &intel).find_path(&request(from, to, 0, &strict), &mut costs);
        assert!(blocked.incomplete);
        assert!(blocked.is_empty());
    }

    #[test]
    fn test_op_limit_gives_incomplete_partial_path() {
        let map = open_map(&[HOME]);
        let intel = Intel::default();
        let mut costs = CostMatrixCache::default();
        let policy = SearchPolicy::default().with_max_ops(3);
        let from = Position::new(5, 5, HOME);
        let to = Position::new(45, 45, HOME);

        let (result, stats) = GridSearch::new(&map, &intel).find_path(&request(from, to, 0, &policy), &mut costs);
        assert!(result.incomplete);
        assert!(!result.is_empty());
        assert_eq!(stats.ops, 3);
    }

    #[test]
    fn test_crosses_room_border() {
        let map = open_map(&[HOME, EAST]);
        let intel = Intel::default();
        let mut costs = CostMatrixCache::default();
        let policy = SearchPolicy::default();
        let from = Position::new(47, 25, HOME);
        let to = Position::new(3, 25, EAST);

        let (result, stats) = GridSearch::new(&map, &intel).find_path(&request(from, to, 0, &policy), &mut costs);
        assert!(!result.incomplete);
        assert_eq!(result.len(), 6);
        assert!(stats.rooms_opened >= 2);
    }

    #[test]
    fn test_avoided_room_is_not_entered() {
        let far = RoomName::new(2, 0);
        let map = open_map(&[HOME, EAST, far]);
        let mut intel = Intel::default();
        intel.0.insert(
            EAST,
            RoomStatus {
                owner: Ownership::Foreign("someone".into()),
                ..Default::default()
            },
        );
        let from = Position::new(45, 25, HOME);
        let to = Position::new(5, 25, far);

        let open = SearchPolicy::default();
        let (direct, _) = GridSearch::new(&map, &intel)
            .find_path(&request(from, to, 0, &open), &mut CostMatrixCache::default());
        assert!(!direct.incomplete);
        assert!(direct.path.iter().any(|p| p.room == EAST));

        let safe = SearchPolicy::safe().avoiding_unknown();
        let (result, stats) = GridSearch::new(&map, &intel)
            .find_path(&request(from, to, 0, &safe), &mut CostMatrixCache::default());
        assert!(result.incomplete);
        assert!(result.path.iter().all(|p| p.room == HOME));
        assert!(stats.rooms_blocked >= 1);
    }

    #[test]
    fn test_creeps_block_unless_ignored() {
        let mut map = open_map(&[HOME]);
        if let Some(room) = map.room_mut(HOME) {
            for y in 0..50 {
                room.terrain.set(12, y, Terrain::Wall);
            }
            room.terrain.set(12, 10, Terrain::Plain);
            room.creeps.push(Position::new(12, 10, HOME));
        }
        let intel = Intel::default();
        let from = Position::new(10, 10, HOME);
        let to = Position::new(14, 10, HOME);

        let ignoring = SearchPolicy::local().with_incomplete(false);
        let (result, _) = GridSearch::new(&map, &intel)
            .find_path(&request(from, to, 0, &ignoring), &mut CostMatrixCache::default());
        assert!(!result.incomplete);

        let careful = ignoring.clone().with_creeps(false);
        let (result, _) = GridSearch::new(&map, &intel)
            .find_path(&request(from, to, 0, &careful), &mut CostMatrixCache::default());
        assert!(result.incomplete);
    }

    #[test]
    fn test_max_path_length_truncates() {
        let map = open_map(&[HOME]);
        let intel = Intel::default();
        let policy = SearchPolicy::default().with_max_path_length(4);
        let from = Position::new(10, 10, HOME);
        let to = Position::new(30, 10, HOME);

        let (result, _) = GridSearch::new(&map, &intel)
            .find_path(&request(from, to, 0, &policy), &mut CostMatrixCache::default());
        assert_eq!(result.len(), 4);
        assert!(result.incomplete);
    }

    fn as_provider<F>(f: F) -> F
    where
        F: FnMut(&PathRequest<'_>, &mut CostMatrixCache) -> (PathResult, SearchStats),
    {
        f
    }

    #[test]
    fn test_closure_is_a_provider() {
        let mut calls = 0;
        let mut stub = as_provider(|req, _| {
            calls += 1;
            (
                PathResult {
                    path: vec![req.destination],
                    ..Default::default()
                },
                SearchStats::default(),
            )
        });
        let policy = SearchPolicy::default();
        let pos = Position::new(1, 1, HOME);
        let (result, _) = stub.find_path(&request(pos, pos, 0, &policy), &mut CostMatrixCache::default());
        assert_eq!(result.path, vec![pos]);
        drop(stub);
        assert_eq!(calls, 1);
    }
}
