//! Process-local backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::{CheckpointRepository, ProfileRepository};
use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::types::{Profile, ProfileId};

/// Profiles and checkpoints held in maps. Values are cloned in and out, so
/// callers never share state with the store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    profiles: RwLock<HashMap<ProfileId, Profile>>,
    checkpoints: RwLock<BTreeMap<u64, Checkpoint>>,
    next_seq: AtomicU64,
}

impl InMemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of snapshots across all profiles.
    #[must_use]
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.read().len()
    }
}

impl ProfileRepository for InMemoryStore {
    fn load_profile(&self, id: &ProfileId) -> Result<Option<Profile>> {
        Ok(self.profiles.read().get(id).cloned())
    }

    fn save_profile(&self, profile: &Profile) -> Result<()> {
        self.profiles
            .write()
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    fn delete_profile(&self, id: &ProfileId) -> Result<bool> {
        Ok(self.profiles.write().remove(id).is_some())
    }

    fn list_profiles(&self) -> Result<Vec<ProfileId>> {
        let mut ids: Vec<ProfileId> = self.profiles.read().keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}

impl CheckpointRepository for InMemoryStore {
    fn insert_checkpoint(&self, checkpoint: &Checkpoint) -> Result<u64> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let mut stored = checkpoint.clone();
        stored.seq = seq;
        self.checkpoints.write().insert(seq, stored);
        Ok(seq)
    }

    fn checkpoints_for(&self, profile: &ProfileId) -> Result<Vec<Checkpoint>> {
        let mut found: Vec<Checkpoint> = self
            .checkpoints
            .read()
            .values()
            .filter(|c| &c.profile_id == profile)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.age.cmp(&a.age).then(b.seq.cmp(&a.seq)));
        Ok(found)
    }

    fn delete_checkpoint(&self, seq: u64) -> Result<bool> {
        Ok(self.checkpoints.write().remove(&seq).is_some())
    }
}
