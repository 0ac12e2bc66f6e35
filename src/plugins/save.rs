use bevy::prelude::*;

use crate::plugins::core::ColonyState;
use crate::resources::snapshot_store::{read_snapshot, save_cache};
use crate::resources::{CacheStore, FileStore, MemoryStore, PathCache, PathCacheConfig, SnapshotStore, TickClock};

/// Plugin that keeps the path cache alive across process restarts.
///
/// Restores the cache at startup, writes it once every `persist_interval`
/// ticks, and exposes [`flush_cache`] for a final write on exit.
pub struct PersistencePlugin;

impl Plugin for PersistencePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<CacheStore>() {
            app.insert_resource(default_store());
        }
        app.init_resource::<PathCacheConfig>()
            .add_systems(
                Startup,
                restore_cache_system.run_if(resource_exists::<PathCache>),
            )
            .add_systems(
                Last,
                persist_cache_system
                    .run_if(in_state(ColonyState::Running))
                    .run_if(resource_exists::<PathCache>),
            );
    }
}

/// File store in the platform data dir, or memory if there is none.
pub fn default_store() -> CacheStore {
    match FileStore::in_data_dir() {
        Some(store) => {
            info!("Path cache snapshots stored in {:?}", store.dir());
            CacheStore::new(store)
        }
        None => {
            warn!("Could not determine data directory, path cache will not persist");
            CacheStore::new(MemoryStore::new())
        }
    }
}

/// Restores the cache from the store. A restarted run resumes the clock from
/// the newest snapshot entry so persisted insertion ticks stay meaningful.
fn restore_cache_system(
    mut cache: ResMut<PathCache>,
    mut clock: ResMut<TickClock>,
    store: Res<CacheStore>,
    config: Res<PathCacheConfig>,
) {
    let snapshot = match read_snapshot(store.0.as_ref(), &config.store_key) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            info!("No path cache snapshot under '{}', starting cold", config.store_key);
            return;
        }
        Err(e) => {
            error!("Failed to read path cache snapshot: {}", e);
            return;
        }
    };

    if let Some(latest) = snapshot.latest_tick() {
        if latest > clock.now() {
            *clock = TickClock::starting_at(latest);
        }
    }
    let restored = cache.restore(&snapshot, clock.now());
    info!(
        "Restored {} of {} cached paths at tick {}",
        restored,
        snapshot.paths.len(),
        clock.now()
    );
}

fn persist_cache_system(
    clock: Res<TickClock>,
    config: Res<PathCacheConfig>,
    cache: Res<PathCache>,
    mut store: ResMut<CacheStore>,
) {
    if clock.every(config.persist_interval) {
        write_snapshot(&cache, store.0.as_mut(), &config.store_key);
    }
}

fn write_snapshot(cache: &PathCache, store: &mut dyn SnapshotStore, key: &str) {
    match save_cache(cache, store, key) {
        Ok(written) => debug!("Saved {} cached paths to '{}'", written, key),
        Err(e) => error!("Failed to save path cache: {}", e),
    }
}

/// Writes the cache one last time. Called by the binary before exiting.
pub fn flush_cache(world: &mut World) {
    let Some(mut store) = world.remove_resource::<CacheStore>() else {
        return;
    };
    if let (Some(cache), Some(config)) = (
        world.get_resource::<PathCache>(),
        world.get_resource::<PathCacheConfig>(),
    ) {
        info!("Flushing {} cached paths", cache.len());
        write_snapshot(cache, store.0.as_mut(), &config.store_key);
    }
    world.insert_resource(store);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::core::CorePlugin;
    use crate::plugins::pathing::PathCachePlugin;
    use crate::resources::CliArgs;
    use crate::utils::pathfinding::PathResult;

    fn app_with(store: CacheStore, persist_interval: u64) -> App {
        let mut app = App::new();
        app.insert_resource(CliArgs {
            workers: 4,
            ..Default::default()
        })
        .insert_resource(PathCacheConfig {
            persist_interval,
            ..Default::default()
        })
        .insert_resource(store)
        .add_plugins((CorePlugin, PathCachePlugin, PersistencePlugin));
        app
    }

    fn stored_paths(app: &App) -> Option<usize> {
        let store = app.world().resource::<CacheStore>();
        read_snapshot(store.0.as_ref(), "path_cache")
            .unwrap()
            .map(|s| s.paths.len())
    }

    #[test]
    fn test_writes_on_interval_only() {
        let mut app = app_with(CacheStore::new(MemoryStore::new()), 5);
        for _ in 0..4 {
            app.update();
        }
        assert_eq!(stored_paths(&app), None);

        app.update();
        assert!(stored_paths(&app).is_some_and(|n| n > 0));
    }

    #[test]
    fn test_restart_restores_and_resumes_clock() {
        let mut store = MemoryStore::new();
        let mut cache = PathCache::new(10).unwrap();
        cache.set_cached_path("E0S0_1_1_0", "E0S0_2_2_1", PathResult::default(), 1000, 400);
        save_cache(&cache, &mut store, "path_cache").unwrap();

        let mut app = app_with(CacheStore::new(store), 50);
        app.update();

        let world = app.world();
        assert!(world.resource::<PathCache>().contains("E0S0_1_1_0", "E0S0_2_2_1"));
        // restore runs in Startup, before the first tick advance in First
        assert!(world.resource::<TickClock>().now() >= 400);
    }

    #[test]
    fn test_flush_writes_current_cache() {
        let mut app = app_with(CacheStore::new(MemoryStore::new()), 1_000);
        app.update();
        app.update();
        assert_eq!(stored_paths(&app), None);

        flush_cache(app.world_mut());
        let cached = app.world().resource::<PathCache>().len();
        assert_eq!(stored_paths(&app), Some(cached));
    }
}
