//! Worker routing through the path cache.
//!
//! Workers without a route ask the cache for one; dozens of workers share a
//! handful of spawn/site journeys, so after the first search almost every
//! request is a hit.

use bevy::prelude::*;

use crate::components::{Location, Route, Worker};
use crate::resources::{ColonyReport, PathCache, RoomIntel, RoomMap, TickClock};
use crate::utils::pathfinding::GridSearch;
use crate::utils::search_policy::SearchPolicy;

/// System that gives every idle worker a route to its current target.
///
/// Checks the cache first; on a miss the cache runs a `GridSearch` against
/// the current room map and intel.
pub fn worker_routing_system(
    mut commands: Commands,
    workers: Query<(Entity, &Worker, &Location), Without<Route>>,
    mut cache: ResMut<PathCache>,
    map: Res<RoomMap>,
    intel: Res<RoomIntel>,
    policy: Res<SearchPolicy>,
    clock: Res<TickClock>,
    mut report: ResMut<ColonyReport>,
) {
    let now = clock.now();
    let mut search = GridSearch::new(&*map, &*intel);

    for (entity, worker, location) in &workers {
        let target = worker.target();
        let result = cache.get_path(&location.0, &target, worker.range, &policy, &mut search, now);

        report.routes_planned += 1;
        if result.incomplete {
            report.incomplete_routes += 1;
            trace!(
                "Worker {:?}: only a partial route from {} to {}",
                entity, location.0, target
            );
        }
        commands.entity(entity).insert(Route::from_result(&result));
    }
}

/// System that moves workers one tile along their route per tick.
///
/// When the route runs out the worker either arrived and turns around, or
/// the route was partial and the leg is abandoned. Either way the route is
/// dropped so the routing system plans the next one.
pub fn worker_movement_system(
    mut commands: Commands,
    mut workers: Query<(Entity, &mut Worker, &mut Location, &mut Route)>,
    mut report: ResMut<ColonyReport>,
) {
    for (entity, mut worker, mut location, mut route) in &mut workers {
        if let Some(step) = route.pop_step() {
            location.0 = step;
        }
        if !route.is_empty() {
            continue;
        }

        let target = worker.target();
        if location.0.range_to(&target) <= worker.range {
            worker.turn_around();
            report.trips += 1;
        } else {
            debug!("Worker {:?} gave up reaching {} from {}", entity, target, location.0);
            worker.give_up();
            report.abandoned += 1;
        }
        commands.entity(entity).remove::<Route>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::room_map::{RoomData, Terrain};
    use crate::utils::position::{Position, RoomName};

    const HOME: RoomName = RoomName::new(0, 0);

    fn test_app(map: RoomMap) -> App {
        let mut app = App::new();
        app.insert_resource(PathCache::new(16).unwrap())
            .insert_resource(map)
            .init_resource::<RoomIntel>()
            .insert_resource(SearchPolicy::local())
            .init_resource::<TickClock>()
            .init_resource::<ColonyReport>()
            .add_systems(Update, (worker_routing_system, worker_movement_system).chain());
        app
    }

    fn open_room() -> RoomMap {
        let mut map = RoomMap::new();
        map.insert(
            HOME,
            RoomData {
                structures: Some(Vec::new()),
                ..Default::default()
            },
        );
        map
    }

    #[test]
    fn test_workers_share_cached_route() {
        let mut app = test_app(open_room());
        let home = Position::new(10, 10, HOME);
        let site = Position::new(20, 10, HOME);
        for _ in 0..3 {
            app.world_mut().spawn((Worker::new(home, site, 1), Location(home)));
        }

        app.update();

        let cache = app.world().resource::<PathCache>();
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 2);
        assert_eq!(app.world().resource::<ColonyReport>().routes_planned, 3);
    }

    #[test]
    fn test_worker_completes_a_leg() {
        let mut app = test_app(open_room());
        let home = Position::new(10, 10, HOME);
        let site = Position::new(14, 10, HOME);
        let worker = app
            .world_mut()
            .spawn((Worker::new(home, site, 1), Location(home)))
            .id();

        // three steps to get within range 1
        for _ in 0..3 {
            app.update();
        }

        let world = app.world();
        let at = world.get::<Location>(worker).unwrap().0;
        assert!(at.range_to(&site) <= 1);
        let state = world.get::<Worker>(worker).unwrap();
        assert!(!state.outbound);
        assert_eq!(state.trips, 1);
        assert!(world.get::<Route>(worker).is_none());
        assert_eq!(world.resource::<ColonyReport>().trips, 1);
    }

    #[test]
    fn test_unreachable_site_is_abandoned() {
        let mut map = open_room();
        let data = map.room_mut(HOME).unwrap();
        // wall off the site
        for x in 29..=31u8 {
            for y in 29..=31u8 {
                if (x, y) != (30, 30) {
                    data.terrain.set(x, y, Terrain::Wall);
                }
            }
        }
        let mut app = test_app(map);
        let home = Position::new(25, 30, HOME);
        let site = Position::new(30, 30, HOME);
        let worker = app
            .world_mut()
            .spawn((Worker::new(home, site, 0), Location(home)))
            .id();

        for _ in 0..10 {
            app.update();
        }

        let report = app.world().resource::<ColonyReport>();
        assert!(report.abandoned >= 1);
        assert!(report.incomplete_routes >= 1);
        assert_eq!(app.world().get::<Worker>(worker).unwrap().trips as u64, report.trips);
    }
}
