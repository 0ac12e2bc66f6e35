//! Room-qualified grid positions and the cache keys derived from them.
//!
//! The world is an unbounded grid of square rooms, each `ROOM_SIZE` tiles wide.
//! Rooms are named the way players read them: `W0N0` sits north-west of the
//! origin and `E0S0` south-east of it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PathCacheError;

/// Width and height of a room in tiles.
pub const ROOM_SIZE: i32 = 50;

/// Identifier of a single room on the world grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomName {
    /// Column on the world grid (negative = west).
    pub x: i32,
    /// Row on the world grid (negative = north).
    pub y: i32,
}

impl RoomName {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the room offset by `(dx, dy)` rooms.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Number of rooms between `self` and `other` (Chebyshev).
    pub fn distance(self, other: RoomName) -> u32 {
        (self.x - other.x).unsigned_abs().max((self.y - other.y).unsigned_abs())
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, hx) = if self.x < 0 { ('W', -self.x - 1) } else { ('E', self.x) };
        let (v, vy) = if self.y < 0 { ('N', -self.y - 1) } else { ('S', self.y) };
        write!(f, "{h}{hx}{v}{vy}")
    }
}

impl FromStr for RoomName {
    type Err = PathCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PathCacheError::InvalidRoomName(s.to_string());

        if !s.is_ascii() {
            return Err(invalid());
        }
        let h = s.chars().next().ok_or_else(invalid)?;
        let split = s[1..]
            .find(|c: char| matches!(c, 'N' | 'S'))
            .map(|i| i + 1)
            .ok_or_else(invalid)?;

        let hx: i32 = s[1..split].parse().map_err(|_| invalid())?;
        let v = s[split..].chars().next().ok_or_else(invalid)?;
        let vy: i32 = s[split + 1..].parse().map_err(|_| invalid())?;
        if hx < 0 || vy < 0 {
            return Err(invalid());
        }

        let x = match h {
            'E' => hx,
            'W' => -hx - 1,
            _ => return Err(invalid()),
        };
        let y = match v {
            'S' => vy,
            'N' => -vy - 1,
            _ => return Err(invalid()),
        };
        Ok(Self { x, y })
    }
}

impl TryFrom<String> for RoomName {
    type Error = PathCacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomName> for String {
    fn from(room: RoomName) -> Self {
        room.to_string()
    }
}

/// A tile inside a room.
///
/// Serialized as `{ "x": .., "y": .., "regionId": "W1N1" }` so that it can live
/// in the durable snapshot store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u8,
    pub y: u8,
    #[serde(rename = "regionId")]
    pub room: RoomName,
}

impl Position {
    pub fn new(x: u8, y: u8, room: RoomName) -> Self {
        Self { x, y, room }
    }

    /// Position on the seamless world grid spanning every room.
    pub fn global(&self) -> (i32, i32) {
        (
            self.room.x * ROOM_SIZE + self.x as i32,
            self.room.y * ROOM_SIZE + self.y as i32,
        )
    }

    /// Inverse of [`Position::global`].
    pub fn from_global(gx: i32, gy: i32) -> Self {
        Self {
            x: gx.rem_euclid(ROOM_SIZE) as u8,
            y: gy.rem_euclid(ROOM_SIZE) as u8,
            room: RoomName::new(gx.div_euclid(ROOM_SIZE), gy.div_euclid(ROOM_SIZE)),
        }
    }

    /// Tile distance, allowing diagonal moves, across room borders.
    pub fn range_to(&self, other: &Position) -> u32 {
        let (ax, ay) = self.global();
        let (bx, by) = other.global();
        (ax - bx).unsigned_abs().max((ay - by).unsigned_abs())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {},{}]", self.room, self.x, self.y)
    }
}

/// Cache key for a position searched with the given range.
///
/// The cache itself never looks inside these strings.
pub fn position_key(pos: &Position, range: u32) -> String {
    format!("{}_{}_{}_{}", pos.room, pos.x, pos.y, range)
}

/// Room prefix shared by every key derived from a position in `room`.
pub fn room_key_prefix(room: RoomName) -> String {
    format!("{room}_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_name_display() {
        assert_eq!(RoomName::new(0, 0).to_string(), "E0S0");
        assert_eq!(RoomName::new(-1, -1).to_string(), "W0N0");
        assert_eq!(RoomName::new(3, -8).to_string(), "E3N7");
    }

    #[test]
    fn test_room_name_parse() {
        assert_eq!("W0N0".parse::<RoomName>().unwrap(), RoomName::new(-1, -1));
        assert_eq!("E12S4".parse::<RoomName>().unwrap(), RoomName::new(12, 4));
        assert!("X1N1".parse::<RoomName>().is_err());
        assert!("W1".parse::<RoomName>().is_err());
        assert!("".parse::<RoomName>().is_err());
    }

    #[test]
    fn test_global_roundtrip_negative_rooms() {
        let pos = Position::new(3, 49, RoomName::new(-2, -1));
        let (gx, gy) = pos.global();
        assert_eq!(gx, -97);
        assert_eq!(gy, -1);
        assert_eq!(Position::from_global(gx, gy), pos);
    }

    #[test]
    fn test_range_across_rooms() {
        let a = Position::new(49, 10, RoomName::new(0, 0));
        let b = Position::new(0, 12, RoomName::new(1, 0));
        assert_eq!(a.range_to(&b), 2);
    }

    #[test]
    fn test_position_key_format() {
        let pos = Position::new(25, 30, "W1N1".parse().unwrap());
        assert_eq!(position_key(&pos, 0), "W1N1_25_30_0");
        assert_eq!(position_key(&pos, 3), "W1N1_25_30_3");
        assert!(position_key(&pos, 3).starts_with(&room_key_prefix(pos.room)));
    }

    #[test]
    fn test_position_json_shape() {
        let pos = Position::new(1, 2, RoomName::new(0, 0));
        let json = serde_json::to_string(&pos).unwrap();
        assert_eq!(json, r#"{"x":1,"y":2,"regionId":"E0S0"}"#);
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pos);
    }
}
