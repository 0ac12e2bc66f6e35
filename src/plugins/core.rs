use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

use crate::components::{Location, Worker};
use crate::resources::{CliArgs, ColonyReport, TickClock};
use crate::systems::intel::refresh_visible_intel;
use crate::systems::world_tick::tick_clock_system;
use crate::utils::procgen::{generate_colony, ColonyGenConfig};
use crate::utils::search_policy::SearchPolicy;

/// Range at which a worker counts as arrived at its site or the spawn.
pub const WORKER_RANGE: u32 = 1;

#[derive(States, Default, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ColonyState {
    /// World generation and cache restore.
    #[default]
    Setup,
    Running,
}

pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<StatesPlugin>() {
            app.add_plugins(StatesPlugin);
        }
        app.init_state::<ColonyState>()
            .init_resource::<CliArgs>()
            .init_resource::<TickClock>()
            .init_resource::<ColonyReport>()
            .init_resource::<SearchPolicy>()
            .add_systems(Startup, setup_colony)
            .add_systems(PostStartup, start_running)
            .add_systems(First, tick_clock_system)
            .add_systems(
                Update,
                refresh_visible_intel.run_if(in_state(ColonyState::Running)),
            )
            .add_systems(OnEnter(ColonyState::Running), log_state_transition);
    }
}

/// Generates the world and spawns one worker per slot, assigned to sites
/// round-robin.
fn setup_colony(mut commands: Commands, cli: Res<CliArgs>, mut policy: ResMut<SearchPolicy>) {
    let colony = generate_colony(&ColonyGenConfig {
        seed: cli.seed,
        ..Default::default()
    });

    if colony.sites.is_empty() {
        warn!("Colony has no work sites; workers will stay idle");
    } else {
        for site in colony.sites.iter().cycle().take(cli.workers) {
            commands.spawn((
                Worker::new(colony.spawn, *site, WORKER_RANGE),
                Location(colony.spawn),
            ));
        }
    }

    // A search never needs to open more rooms than the world has.
    let rooms = colony.map.len() as u32;
    if policy.max_rooms > rooms {
        *policy = policy.clone().with_max_rooms(rooms);
    }

    info!(
        "Colony set up in {} with {} workers across {} sites",
        colony.home,
        if colony.sites.is_empty() { 0 } else { cli.workers },
        colony.sites.len()
    );
    commands.insert_resource(colony.map);
    commands.insert_resource(colony.intel);
}

fn start_running(mut next_state: ResMut<NextState<ColonyState>>) {
    next_state.set(ColonyState::Running);
}

fn log_state_transition(clock: Res<TickClock>) {
    info!("Colony running from tick {}", clock.now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{RoomIntel, RoomMap};

    #[test]
    fn test_setup_spawns_workers_and_world() {
        let mut app = App::new();
        app.insert_resource(CliArgs {
            workers: 5,
            ..Default::default()
        })
        .add_plugins(CorePlugin);
        app.update();

        let world = app.world_mut();
        assert!(world.get_resource::<RoomMap>().is_some());
        assert!(world.get_resource::<RoomIntel>().is_some());
        assert_eq!(world.query::<&Worker>().iter(world).count(), 5);
        let rooms = world.resource::<RoomMap>().len() as u32;
        assert_eq!(world.resource::<SearchPolicy>().max_rooms, rooms);
        assert_eq!(world.resource::<TickClock>().now(), 1);
        assert_eq!(*world.resource::<State<ColonyState>>().get(), ColonyState::Running);
    }
}
