//! Error types for the life-simulation core.

use thiserror::Error;

use crate::types::{ProfileId, ProfilePhase};

/// Top-level error type for all core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No profile is stored under the given id.
    #[error("Profile not found: {0}")]
    ProfileNotFound(ProfileId),

    /// No checkpoint exists for the given profile at the given age.
    #[error("Checkpoint not found for profile {profile} at age {age}")]
    CheckpointNotFound {
        /// Profile the lookup was made for.
        profile: ProfileId,
        /// Requested age.
        age: u32,
    },

    /// The operation is not allowed in the profile's current lifecycle phase.
    #[error("Profile {profile} is {actual:?}, operation requires {expected}")]
    InvalidPhase {
        /// Profile the operation targeted.
        profile: ProfileId,
        /// Human-readable list of accepted phases.
        expected: &'static str,
        /// Phase the profile was actually in.
        actual: ProfilePhase,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, CoreError>;
