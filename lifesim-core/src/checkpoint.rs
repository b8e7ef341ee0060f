//! Immutable profile snapshots and rollback.
//!
//! A [`Checkpoint`] is the full JSON serialisation of a [`Profile`] (NPCs and
//! life history included) taken at one age. The [`CheckpointStore`] writes
//! them through a [`CheckpointRepository`], applies the configured retention
//! policy and restores them on rollback.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{CheckpointConfig, DuplicatePolicy};
use crate::error::{CoreError, Result};
use crate::persistence::{CheckpointRepository, ProfileRepository, Store};
use crate::types::{Profile, ProfileId};

/// One stored snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Insertion sequence number assigned by the repository (0 until stored).
    #[serde(default)]
    pub seq: u64,
    /// Profile the snapshot belongs to.
    pub profile_id: ProfileId,
    /// `current_age` at capture time.
    pub age: u32,
    /// Capture time.
    pub created_at: DateTime<Utc>,
    /// Serialised profile.
    pub snapshot: String,
}

impl Checkpoint {
    /// Serialise `profile` into an unsaved checkpoint.
    ///
    /// # Errors
    /// Returns [`CoreError::Serialization`] if the profile cannot be encoded.
    pub fn capture(profile: &Profile) -> Result<Self> {
        Ok(Self {
            seq: 0,
            profile_id: profile.id.clone(),
            age: profile.current_age,
            created_at: Utc::now(),
            snapshot: serde_json::to_string(profile)?,
        })
    }

    /// Deserialise the snapshot back into a profile.
    ///
    /// # Errors
    /// Returns [`CoreError::Serialization`] if the snapshot is corrupt.
    pub fn restore(&self) -> Result<Profile> {
        Ok(serde_json::from_str(&self.snapshot)?)
    }
}

/// Snapshot / rollback service over a [`Store`].
pub struct CheckpointStore {
    store: Arc<dyn Store>,
    config: CheckpointConfig,
}

impl std::fmt::Debug for CheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CheckpointStore {
    /// Create a checkpoint service with the given retention policy.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: CheckpointConfig) -> Self {
        Self { store, config }
    }

    /// Snapshot `profile`. Failures are logged and swallowed; the returned
    /// sequence number is `None` when nothing was stored.
    pub fn create_checkpoint(&self, profile: &Profile) -> Option<u64> {
        match self.try_create_checkpoint(profile) {
            Ok(seq) => Some(seq),
            Err(e) => {
                warn!(
                    profile = %profile.id,
                    age = profile.current_age,
                    error = %e,
                    "Checkpoint creation failed"
                );
                None
            }
        }
    }

    /// Snapshot `profile` and apply retention, propagating errors.
    ///
    /// # Errors
    /// Serialization or backend failures.
    pub fn try_create_checkpoint(&self, profile: &Profile) -> Result<u64> {
        let checkpoint = Checkpoint::capture(profile)?;
        let seq = self.store.insert_checkpoint(&checkpoint)?;
        let evicted = self.enforce_retention(&profile.id, profile.current_age, seq)?;

        debug!(
            profile = %profile.id,
            age = profile.current_age,
            seq,
            evicted,
            "Checkpoint stored"
        );
        Ok(seq)
    }

    /// Restore the profile to its snapshot at `age` and persist it.
    ///
    /// When several snapshots exist for that age the most recently inserted
    /// one is used. Later snapshots are left in place.
    ///
    /// # Errors
    /// [`CoreError::CheckpointNotFound`] if no snapshot exists at `age`, or
    /// decoding / backend failures.
    pub fn rollback(&self, profile_id: &ProfileId, age: u32) -> Result<Profile> {
        let checkpoint = self
            .find(profile_id, age)?
            .ok_or_else(|| CoreError::CheckpointNotFound {
                profile: profile_id.clone(),
                age,
            })?;

        let restored = checkpoint.restore()?;
        self.store.save_profile(&restored)?;

        info!(
            profile = %profile_id,
            age,
            seq = checkpoint.seq,
            "Profile rolled back"
        );
        Ok(restored)
    }

    /// The canonical snapshot at `age`, if any.
    ///
    /// # Errors
    /// Backend failures.
    pub fn find(&self, profile_id: &ProfileId, age: u32) -> Result<Option<Checkpoint>> {
        // Scan order is age desc, seq desc: the first hit is the newest.
        Ok(self
            .store
            .checkpoints_for(profile_id)?
            .into_iter()
            .find(|c| c.age == age))
    }

    /// All snapshots of a profile, age descending.
    ///
    /// # Errors
    /// Backend failures.
    pub fn history(&self, profile_id: &ProfileId) -> Result<Vec<Checkpoint>> {
        self.store.checkpoints_for(profile_id)
    }

    fn enforce_retention(&self, profile_id: &ProfileId, age: u32, keep_seq: u64) -> Result<usize> {
        let mut evicted = 0;

        if self.config.duplicate_policy == DuplicatePolicy::ReplaceSameAge {
            for stale in self
                .store
                .checkpoints_for(profile_id)?
                .iter()
                .filter(|c| c.age == age && c.seq != keep_seq)
            {
                if self.store.delete_checkpoint(stale.seq)? {
                    evicted += 1;
                }
            }
        }

        if let Some(max) = self.config.max_per_profile {
            let remaining = self.store.checkpoints_for(profile_id)?;
            let excess = remaining.len().saturating_sub(max.max(1));
            // Tail of the scan holds the lowest ages, oldest first within an age.
            for victim in remaining
                .iter()
                .rev()
                .filter(|c| c.seq != keep_seq)
                .take(excess)
            {
                if self.store.delete_checkpoint(victim.seq)? {
                    evicted += 1;
                }
            }
        }

        Ok(evicted)
    }
}
