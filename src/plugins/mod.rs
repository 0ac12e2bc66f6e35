pub mod core;
pub mod pathing;
pub mod save;
