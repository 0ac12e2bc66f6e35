//! Pathfinding result cache for an autonomous colony agent.
//!
//! The heart of the crate is [`resources::PathCache`]: a bounded LRU cache
//! with per-entry TTL wrapped around an expensive path search, together with
//! the per-room cost matrix cache that search depends on. Everything else is
//! the headless Bevy app that exercises it.

pub mod components;
pub mod error;
pub mod plugins;
pub mod resources;
pub mod systems;
pub mod utils;
