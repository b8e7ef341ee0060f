//! Yearly evolution of supporting characters.

use std::sync::Arc;

use lifesim_core::npc::{truncate_chars, NpcStatus, StatusClassifier};
use lifesim_core::types::Profile;
use lifesim_llm::OracleRole;
use serde::Serialize;
use tracing::{debug, warn};

use crate::prompts;
use crate::Oracle;

/// What happened to one NPC this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpcUpdate {
    /// NPC name.
    pub name: String,
    /// Age after the increment.
    pub age: u32,
    /// Status before the update.
    pub status_before: NpcStatus,
    /// Status after the update.
    pub status_after: NpcStatus,
    /// New situation, `None` when no update was requested or the oracle failed.
    pub situation: Option<String>,
}

/// Ages every NPC and asks the oracle what became of them.
pub struct NpcEvolution {
    oracle: Arc<Oracle>,
    classifier: Arc<dyn StatusClassifier>,
    max_chars: usize,
}

impl std::fmt::Debug for NpcEvolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpcEvolution")
            .field("max_chars", &self.max_chars)
            .finish_non_exhaustive()
    }
}

impl NpcEvolution {
    /// Create with a classifier and a situation length cap.
    #[must_use]
    pub fn new(oracle: Arc<Oracle>, classifier: Arc<dyn StatusClassifier>, max_chars: usize) -> Self {
        Self {
            oracle,
            classifier,
            max_chars,
        }
    }

    /// Evolve all NPCs of `profile` in list order, one oracle call each.
    ///
    /// Every NPC ages by one year. Dead NPCs get no oracle call. A failed
    /// call leaves that NPC's situation and status unchanged.
    pub async fn evolve(&self, profile: &mut Profile) -> Vec<NpcUpdate> {
        let mut updates = Vec::with_capacity(profile.npcs.len());

        for index in 0..profile.npcs.len() {
            profile.npcs[index].age += 1;
            let npc = &profile.npcs[index];
            let status_before = npc.status;

            if npc.status.is_dead() {
                updates.push(NpcUpdate {
                    name: npc.name.clone(),
                    age: npc.age,
                    status_before,
                    status_after: status_before,
                    situation: None,
                });
                continue;
            }

            let prompt = prompts::npc_evolution(npc, profile, self.max_chars);
            let situation = match self.oracle.try_call(OracleRole::NpcEngine, &prompt).await {
                Ok(text) if !text.trim().is_empty() => Some(truncate_chars(text.trim(), self.max_chars)),
                Ok(_) => None,
                Err(e) => {
                    warn!(npc = %profile.npcs[index].name, error = %e, "NPC update unavailable");
                    None
                }
            };

            let npc = &mut profile.npcs[index];
            if let Some(text) = &situation {
                npc.apply_update(text.clone(), self.classifier.as_ref());
            }
            debug!(
                npc = %npc.name,
                age = npc.age,
                status = ?npc.status,
                updated = situation.is_some(),
                "NPC evolved"
            );

            updates.push(NpcUpdate {
                name: npc.name.clone(),
                age: npc.age,
                status_before,
                status_after: npc.status,
                situation,
            });
        }

        updates
    }
}
