pub mod lru_list;
pub mod pathfinding;
pub mod position;
pub mod procgen;
pub mod search_policy;
