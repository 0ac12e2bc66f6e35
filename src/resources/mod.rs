pub mod cache_config;
pub mod cli;
pub mod colony_report;
pub mod cost_matrix;
pub mod path_cache;
pub mod room_intel;
pub mod room_map;
pub mod snapshot_store;
pub mod tick_clock;

pub use cache_config::*;
pub use cli::*;
pub use colony_report::*;
pub use cost_matrix::*;
pub use path_cache::*;
pub use room_intel::*;
pub use room_map::*;
pub use snapshot_store::*;
pub use tick_clock::*;
