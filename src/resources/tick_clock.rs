use bevy::prelude::*;

/// Ticks between progress log lines.
pub const TICKS_PER_REPORT: u64 = 100;

/// Resource tracking the colony's tick counter.
///
/// Every tick-stamped value in the crate (cache entries, cost matrices,
/// room intel) is measured against this clock. It starts at 0 and advances
/// once per app update, before any system that reads it.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct TickClock {
    /// Current tick.
    pub tick: u64,
}

impl TickClock {
    /// Starts the clock at a given tick, e.g. to continue a persisted run.
    pub fn starting_at(tick: u64) -> Self {
        Self { tick }
    }

    pub fn now(&self) -> u64 {
        self.tick
    }

    /// Advances the clock by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
        if self.tick % TICKS_PER_REPORT == 0 {
            debug!("Tick {}", self.tick);
        }
    }

    /// Returns true once every `interval` ticks. An interval of 0 never fires.
    pub fn every(&self, interval: u64) -> bool {
        interval > 0 && self.tick % interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_clock() {
        let clock = TickClock::default();
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn test_advance_tick() {
        let mut clock = TickClock::starting_at(41);
        clock.advance();
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_every_interval() {
        let clock = TickClock::starting_at(100);
        assert!(clock.every(50));
        assert!(!clock.every(30));
        assert!(!clock.every(0));
    }
}
