use bevy::prelude::*;
use crate::resources::TickClock;

/// System that advances the tick clock once per app update.
///
/// Runs in `First` so every other system in the update sees the same tick.
pub fn tick_clock_system(mut clock: ResMut<TickClock>) {
    clock.advance();
}
