pub mod cache_stats;
pub mod intel;
pub mod routing;
pub mod world_tick;

pub use cache_stats::*;
pub use intel::*;
pub use routing::*;
pub use world_tick::*;
