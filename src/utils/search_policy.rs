//! Search limits and room-avoidance rules handed to a path provider.
//!
//! The path cache never reads any of this; it only forwards the policy to the
//! provider on a miss.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::position::RoomName;

/// Who controls a room, as far as our intel knows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ownership {
    #[default]
    Unowned,
    Mine,
    /// Owned by a player we trust.
    Ally(String),
    /// Owned by anyone else.
    Foreign(String),
}

/// Server-side accessibility zone of a room.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomAccess {
    #[default]
    Normal,
    Novice,
    Respawn,
    Closed,
}

/// Last known classification of a room.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStatus {
    pub owner: Ownership,
    /// Hostile units seen on the last visit.
    pub hostile_creeps: u32,
    /// Armed stationary defenses (towers) present.
    pub has_towers: bool,
    /// Aggressive NPC guards (source keepers) present.
    pub has_keepers: bool,
    pub access: RoomAccess,
    /// Tick the room was last observed.
    pub last_seen: u64,
}

/// Answers "what do we know about this room" for the search.
pub trait RoomStatusOracle {
    /// Last recorded status, or `None` if the room was never scouted.
    fn status(&self, room: RoomName) -> Option<&RoomStatus>;

    /// Whether the recorded status is too old to trust.
    fn is_stale(&self, room: RoomName, now: u64) -> bool;
}

/// Controls how a path provider searches and which rooms it refuses to enter.
///
/// Also used as the colony-wide resource workers route with.
#[derive(Resource, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchPolicy {
    pub avoid_hostile_rooms: bool,
    pub avoid_foreign_owned_rooms: bool,
    pub avoid_rooms_with_towers: bool,
    pub avoid_keeper_rooms: bool,
    /// Treat never-scouted and stale rooms as impassable.
    pub avoid_unknown_rooms: bool,
    /// Only cross rooms in the same access zone as the origin.
    pub same_room_status: bool,
    /// Maximum number of rooms the search may open.
    pub max_rooms: u32,
    /// Maximum number of nodes the search may expand.
    pub max_ops: u32,
    /// Truncate returned paths to this many steps.
    pub max_path_length: Option<u32>,
    /// Return the best partial path when the destination can't be reached.
    pub allow_incomplete: bool,
    /// Ignore units standing on tiles (they move every tick).
    pub ignore_creeps: bool,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            avoid_hostile_rooms: false,
            avoid_foreign_owned_rooms: false,
            avoid_rooms_with_towers: false,
            avoid_keeper_rooms: false,
            avoid_unknown_rooms: false,
            same_room_status: true,
            max_rooms: 16,
            max_ops: 2000,
            max_path_length: None,
            allow_incomplete: true,
            ignore_creeps: true,
        }
    }
}

impl SearchPolicy {
    /// Policy for unarmed units: stay out of anything that shoots back.
    pub fn safe() -> Self {
        Self {
            avoid_hostile_rooms: true,
            avoid_foreign_owned_rooms: true,
            avoid_rooms_with_towers: true,
            avoid_keeper_rooms: true,
            ..Self::default()
        }
    }

    /// Single-room search.
    pub fn local() -> Self {
        Self {
            max_rooms: 1,
            ..Self::default()
        }
    }

    pub fn with_max_ops(mut self, max_ops: u32) -> Self {
        self.max_ops = max_ops;
        self
    }

    pub fn with_max_rooms(mut self, max_rooms: u32) -> Self {
        self.max_rooms = max_rooms;
        self
    }

    pub fn with_max_path_length(mut self, length: u32) -> Self {
        self.max_path_length = Some(length);
        self
    }

    pub fn with_incomplete(mut self, allow: bool) -> Self {
        self.allow_incomplete = allow;
        self
    }

    pub fn with_creeps(mut self, ignore: bool) -> Self {
        self.ignore_creeps = ignore;
        self
    }

    pub fn avoiding_unknown(mut self) -> Self {
        self.avoid_unknown_rooms = true;
        self
    }

    /// Whether `room` must be treated as fully blocked.
    ///
    /// The rooms holding the origin and the destination are only rejected when
    /// they are closed; otherwise the unit could never leave or arrive.
    pub fn should_avoid(
        &self,
        room: RoomName,
        origin: RoomName,
        destination: RoomName,
        oracle: &dyn RoomStatusOracle,
        now: u64,
    ) -> bool {
        let status = oracle.status(room);
        if status.is_some_and(|s| s.access == RoomAccess::Closed) {
            return true;
        }
        if room == origin || room == destination {
            return false;
        }

        let Some(status) = status else {
            return self.avoid_unknown_rooms;
        };
        if self.avoid_unknown_rooms && oracle.is_stale(room, now) {
            return true;
        }

        if self.same_room_status {
            let origin_access = oracle.status(origin).map(|s| s.access).unwrap_or_default();
            if status.access != origin_access {
                return true;
            }
        }

        let foreign = matches!(status.owner, Ownership::Foreign(_));
        (self.avoid_hostile_rooms && status.hostile_creeps > 0)
            || (self.avoid_foreign_owned_rooms && foreign)
            || (self.avoid_rooms_with_towers && status.has_towers && status.owner != Ownership::Mine)
            || (self.avoid_keeper_rooms && status.has_keepers)
    }
}
