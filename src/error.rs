//! Error type shared by the path cache, its configuration and its stores.

use thiserror::Error;

/// Failures that can surface from the path cache subsystem.
///
/// Cache misses, expiry and eviction are normal control flow and never show
/// up here; only programmer errors and store I/O do.
#[derive(Debug, Error)]
pub enum PathCacheError {
    #[error("path cache capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    #[error("list node {0} is not linked")]
    DetachedNode(usize),

    #[error("list node {0} cannot be used as an insertion anchor")]
    InvalidAnchor(usize),

    #[error("invalid room name `{0}`")]
    InvalidRoomName(String),

    #[error("snapshot store error: {0}")]
    Store(String),

    #[error("failed to (de)serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PathCacheError>;
