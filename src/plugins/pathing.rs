use bevy::prelude::*;

use crate::plugins::core::ColonyState;
use crate::resources::{PathCache, PathCacheConfig};
use crate::systems::cache_stats::log_cache_stats;
use crate::systems::routing::{worker_movement_system, worker_routing_system};

/// Wires the path cache into the app and routes workers through it.
///
/// Uses a `PathCache` resource if one was inserted beforehand, otherwise
/// builds one from `PathCacheConfig`. An invalid config disables routing
/// rather than taking the app down.
pub struct PathCachePlugin;

impl Plugin for PathCachePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PathCacheConfig>();

        if !app.world().contains_resource::<PathCache>() {
            let config = app.world().resource::<PathCacheConfig>();
            match PathCache::from_config(config) {
                Ok(cache) => {
                    app.insert_resource(cache);
                }
                Err(e) => error!("Path cache disabled: {}", e),
            }
        }

        app.add_systems(
            Update,
            (worker_routing_system, worker_movement_system)
                .chain()
                .run_if(in_state(ColonyState::Running))
                .run_if(resource_exists::<PathCache>),
        )
        .add_systems(
            Last,
            log_cache_stats.run_if(resource_exists::<PathCache>),
        );
    }
}
