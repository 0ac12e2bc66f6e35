use bevy::prelude::*;

/// Running totals of what the workers did, for the end-of-run summary.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct ColonyReport {
    /// Routes handed out to workers, cached or freshly searched.
    pub routes_planned: u64,
    /// Routes that stopped short of their target.
    pub incomplete_routes: u64,
    /// Legs completed.
    pub trips: u64,
    /// Legs abandoned because the target could not be reached.
    pub abandoned: u64,
}

impl ColonyReport {
    /// One-line summary for the log.
    pub fn summary(&self) -> String {
        format!(
            "{} routes planned ({} incomplete), {} trips completed, {} abandoned",
            self.routes_planned, self.incomplete_routes, self.trips, self.abandoned
        )
    }
}
