use bevy::prelude::*;

use crate::resources::{PathCache, TickClock};

/// Ticks between cache statistics log lines.
pub const STATS_LOG_INTERVAL: u64 = 100;

/// System that periodically logs path cache statistics.
///
/// The walked size is compared against the maintained count; a mismatch
/// means the LRU list has been corrupted.
pub fn log_cache_stats(clock: Res<TickClock>, cache: Res<PathCache>) {
    if !clock.every(STATS_LOG_INTERVAL) {
        return;
    }
    let stats = cache.stats();
    info!(
        "Tick {}: {} cached paths, {} hits / {} misses ({:.0}% hit rate), {} cost matrices",
        clock.now(),
        stats.list_count,
        stats.hits,
        stats.misses,
        cache.hit_rate() * 100.0,
        stats.region_cache_size
    );
    if stats.size != stats.list_count {
        error!(
            "Path cache list holds {} entries but counts {}",
            stats.size, stats.list_count
        );
    }
}
