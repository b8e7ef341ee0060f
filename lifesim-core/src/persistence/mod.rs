//! Persistence contracts and backends.
//!
//! Profiles and checkpoints are only ever read and written as whole values
//! by key. No partial-field updates exist anywhere in the crate.
//!
//! - [`SqliteStore`]: JSON-in-BLOB rows in SQLite, for real deployments.
//! - [`InMemoryStore`]: process-local maps, for tests and embedding.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use crate::checkpoint::Checkpoint;
use crate::error::{CoreError, Result};
use crate::types::{Profile, ProfileId};

/// Load-by-id / save-whole-aggregate access to profiles.
pub trait ProfileRepository: Send + Sync {
    /// Load a profile, `None` if absent.
    ///
    /// # Errors
    /// Backend or decoding failures.
    fn load_profile(&self, id: &ProfileId) -> Result<Option<Profile>>;

    /// Insert or replace the whole profile aggregate.
    ///
    /// # Errors
    /// Backend or encoding failures.
    fn save_profile(&self, profile: &Profile) -> Result<()>;

    /// Delete a profile together with the NPCs and history it owns.
    /// Checkpoints are not owned and survive. Returns whether a row existed.
    ///
    /// # Errors
    /// Backend failures.
    fn delete_profile(&self, id: &ProfileId) -> Result<bool>;

    /// All stored profile ids.
    ///
    /// # Errors
    /// Backend failures.
    fn list_profiles(&self) -> Result<Vec<ProfileId>>;

    /// Load a profile or fail with [`CoreError::ProfileNotFound`].
    ///
    /// # Errors
    /// `ProfileNotFound`, or any error from [`load_profile`](Self::load_profile).
    fn require_profile(&self, id: &ProfileId) -> Result<Profile> {
        self.load_profile(id)?
            .ok_or_else(|| CoreError::ProfileNotFound(id.clone()))
    }
}

/// Append / scan access to checkpoints.
pub trait CheckpointRepository: Send + Sync {
    /// Store a snapshot and return its insertion sequence number.
    ///
    /// # Errors
    /// Backend failures.
    fn insert_checkpoint(&self, checkpoint: &Checkpoint) -> Result<u64>;

    /// All snapshots of a profile, ordered by age descending, then by
    /// insertion descending (newest first within one age).
    ///
    /// # Errors
    /// Backend or decoding failures.
    fn checkpoints_for(&self, profile: &ProfileId) -> Result<Vec<Checkpoint>>;

    /// Delete a snapshot by sequence number. Returns whether it existed.
    ///
    /// # Errors
    /// Backend failures.
    fn delete_checkpoint(&self, seq: u64) -> Result<bool>;
}

/// A store that can hold both aggregates.
pub trait Store: ProfileRepository + CheckpointRepository {}

impl<T: ProfileRepository + CheckpointRepository> Store for T {}
