use bevy::prelude::*;
use std::collections::VecDeque;

use crate::utils::pathfinding::PathResult;
use crate::utils::position::Position;

/// A unit commuting between the spawn and a work site.
#[derive(Component, Debug, Clone)]
pub struct Worker {
    /// Where the worker unloads.
    pub home: Position,
    /// Where the worker gathers.
    pub site: Position,
    /// How close to a target counts as arrived.
    pub range: u32,
    /// True while heading to the site.
    pub outbound: bool,
    /// Completed legs in either direction.
    pub trips: u32,
}

impl Worker {
    pub fn new(home: Position, site: Position, range: u32) -> Self {
        Self {
            home,
            site,
            range,
            outbound: true,
            trips: 0,
        }
    }

    /// Where the current leg ends.
    pub fn target(&self) -> Position {
        if self.outbound {
            self.site
        } else {
            self.home
        }
    }

    /// Flips direction after arriving.
    pub fn turn_around(&mut self) {
        self.outbound = !self.outbound;
        self.trips += 1;
    }

    /// Flips direction without counting the leg.
    pub fn give_up(&mut self) {
        self.outbound = !self.outbound;
    }
}

/// Tile the entity currently stands on.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location(pub Position);

/// The path a worker is following.
#[derive(Component, Debug, Clone, Default)]
pub struct Route {
    /// Remaining steps; the front is the next tile.
    pub steps: VecDeque<Position>,
    /// The route stops short of the target.
    pub incomplete: bool,
}

impl Route {
    pub fn from_result(result: &PathResult) -> Self {
        Self {
            steps: result.path.iter().copied().collect(),
            incomplete: result.incomplete,
        }
    }

    /// Removes and returns the next step.
    pub fn pop_step(&mut self) -> Option<Position> {
        self.steps.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::position::RoomName;

    #[test]
    fn test_worker_alternates_targets() {
        let room = RoomName::new(0, 0);
        let home = Position::new(25, 25, room);
        let site = Position::new(10, 10, room);
        let mut worker = Worker::new(home, site, 1);

        assert_eq!(worker.target(), site);
        worker.turn_around();
        assert_eq!(worker.target(), home);
        assert_eq!(worker.trips, 1);
    }

    #[test]
    fn test_route_pops_in_order() {
        let room = RoomName::new(0, 0);
        let result = PathResult {
            path: vec![Position::new(1, 1, room), Position::new(2, 2, room)],
            ..Default::default()
        };
        let mut route = Route::from_result(&result);
        assert_eq!(route.steps.len(), 2);
        assert_eq!(route.pop_step(), Some(Position::new(1, 1, room)));
        assert_eq!(route.steps.front(), Some(&Position::new(2, 2, room)));
        assert_eq!(route.pop_step(), Some(Position::new(2, 2, room)));
        assert_eq!(route.pop_step(), None);
        assert!(route.is_empty());
    }
}
