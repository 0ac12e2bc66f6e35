//! Scouting intel about rooms, consulted by the search to decide which rooms
//! are off limits.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::utils::position::RoomName;
use crate::utils::search_policy::{RoomStatus, RoomStatusOracle};

/// Intel older than this many ticks counts as unknown.
pub const DEFAULT_INTEL_STALE_AFTER: u64 = 5_000;

/// Global registry of room statuses keyed by room name.
#[derive(Resource, Debug)]
pub struct RoomIntel {
    rooms: HashMap<RoomName, RoomStatus>,
    stale_after: u64,
}

impl Default for RoomIntel {
    fn default() -> Self {
        Self::new(DEFAULT_INTEL_STALE_AFTER)
    }
}

impl RoomIntel {
    pub fn new(stale_after: u64) -> Self {
        Self {
            rooms: HashMap::new(),
            stale_after,
        }
    }

    /// Stores a fresh observation of a room.
    pub fn record(&mut self, room: RoomName, mut status: RoomStatus, now: u64) {
        status.last_seen = now;
        self.rooms.insert(room, status);
    }

    pub fn get_mut(&mut self, room: RoomName) -> Option<&mut RoomStatus> {
        self.rooms.get_mut(&room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl RoomStatusOracle for RoomIntel {
    fn status(&self, room: RoomName) -> Option<&RoomStatus> {
        self.rooms.get(&room)
    }

    fn is_stale(&self, room: RoomName, now: u64) -> bool {
        self.rooms
            .get(&room)
            .map_or(true, |s| now.saturating_sub(s.last_seen) > self.stale_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_stamps_last_seen() {
        let mut intel = RoomIntel::new(100);
        let room = RoomName::new(2, 3);
        intel.record(room, RoomStatus::default(), 40);
        assert_eq!(intel.status(room).map(|s| s.last_seen), Some(40));
        assert!(!intel.is_stale(room, 140));
        assert!(intel.is_stale(room, 141));
        assert!(intel.is_stale(RoomName::new(9, 9), 0));
    }
}
