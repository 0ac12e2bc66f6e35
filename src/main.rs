use bevy::log::LogPlugin;
use bevy::prelude::*;

use colony_paths::error::Result;
use colony_paths::plugins::core::CorePlugin;
use colony_paths::plugins::pathing::PathCachePlugin;
use colony_paths::plugins::save::{default_store, flush_cache, PersistencePlugin};
use colony_paths::resources::{
    CacheStore, CliArgs, ColonyReport, FileStore, MemoryStore, PathCache, PathCacheConfig,
    TickClock,
};

fn main() -> Result<()> {
    let cli = CliArgs::parse();

    let mut config = match &cli.config {
        Some(path) => PathCacheConfig::load(path)?,
        None => PathCacheConfig::default(),
    };
    if let Some(capacity) = cli.capacity {
        config.capacity = capacity;
    }
    let cache = PathCache::from_config(&config)?;
    let ticks = cli.ticks;
    let no_persist = cli.no_persist;
    let state_dir = cli.state_dir.clone();
    let log_plugin = match &cli.log_level {
        Some(filter) => LogPlugin {
            filter: filter.clone(),
            ..Default::default()
        },
        None => LogPlugin::default(),
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(log_plugin)
        .insert_resource(cli)
        .insert_resource(config)
        .insert_resource(cache);

    // After LogPlugin so the store choice is logged
    let store = match (no_persist, state_dir) {
        (true, _) => CacheStore::new(MemoryStore::new()),
        (false, Some(dir)) => CacheStore::new(FileStore::new(dir)),
        (false, None) => default_store(),
    };
    app.insert_resource(store)
        .add_plugins((CorePlugin, PathCachePlugin, PersistencePlugin));

    app.finish();
    app.cleanup();
    for _ in 0..ticks {
        app.update();
    }

    flush_cache(app.world_mut());
    report_summary(app.world());
    Ok(())
}

fn report_summary(world: &World) {
    let tick = world.get_resource::<TickClock>().map_or(0, TickClock::now);
    if let Some(report) = world.get_resource::<ColonyReport>() {
        info!("Finished at tick {}: {}", tick, report.summary());
    }
    if let Some(cache) = world.get_resource::<PathCache>() {
        let stats = cache.stats();
        info!(
            "Path cache: {} entries, {} hits, {} misses ({:.1}% hit rate), {} evictions, {} cost matrix builds",
            stats.list_count,
            stats.hits,
            stats.misses,
            cache.hit_rate() * 100.0,
            cache.evictions(),
            cache.costs().builds()
        );
    }
}
