use bevy::prelude::*;

use crate::resources::room_map::WorldView;
use crate::resources::{RoomIntel, RoomMap, TickClock};

/// Ticks between intel refreshes of visible rooms.
pub const INTEL_REFRESH_INTERVAL: u64 = 100;

/// System that re-stamps intel for every room we currently see, so visible
/// rooms never count as stale to the search.
pub fn refresh_visible_intel(
    clock: Res<TickClock>,
    map: Res<RoomMap>,
    mut intel: ResMut<RoomIntel>,
) {
    if !clock.every(INTEL_REFRESH_INTERVAL) {
        return;
    }
    let now = clock.now();
    let mut refreshed = 0;
    for room in map.room_names() {
        if map.structures(room).is_none() {
            continue;
        }
        if let Some(status) = intel.get_mut(room) {
            status.last_seen = now;
            refreshed += 1;
        }
    }
    trace!("Refreshed intel for {} visible rooms", refreshed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::room_map::RoomData;
    use crate::utils::position::RoomName;
    use crate::utils::search_policy::{RoomStatus, RoomStatusOracle};

    #[test]
    fn test_only_visible_rooms_refreshed() {
        let seen = RoomName::new(0, 0);
        let unseen = RoomName::new(1, 0);
        let mut map = RoomMap::new();
        map.insert(seen, RoomData { structures: Some(Vec::new()), ..Default::default() });
        map.insert(unseen, RoomData::default());
        let mut intel = RoomIntel::new(50);
        intel.record(seen, RoomStatus::default(), 0);
        intel.record(unseen, RoomStatus::default(), 0);

        let mut app = App::new();
        app.insert_resource(map)
            .insert_resource(intel)
            .insert_resource(TickClock::starting_at(INTEL_REFRESH_INTERVAL))
            .add_systems(Update, refresh_visible_intel);
        app.update();

        let intel = app.world().resource::<RoomIntel>();
        assert!(!intel.is_stale(seen, INTEL_REFRESH_INTERVAL));
        assert!(intel.is_stale(unseen, INTEL_REFRESH_INTERVAL));
    }
}
