//! Rolling long-term memory.

use std::sync::Arc;

use lifesim_core::types::Profile;
use lifesim_llm::OracleRole;
use serde::Serialize;
use tracing::{debug, warn};

use crate::prompts;
use crate::Oracle;

/// Result of a consolidation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOutcome {
    /// The memory was replaced.
    Updated,
    /// The previous memory was kept.
    Retained,
}

/// Compresses each turn's narrative into the profile's long-term memory.
#[derive(Debug, Clone)]
pub struct MemoryConsolidator {
    oracle: Arc<Oracle>,
    soft_limit_chars: usize,
}

impl MemoryConsolidator {
    /// Create with a soft length target.
    #[must_use]
    pub fn new(oracle: Arc<Oracle>, soft_limit_chars: usize) -> Self {
        Self {
            oracle,
            soft_limit_chars,
        }
    }

    /// Merge `new_event` into `profile.long_term_memory`.
    ///
    /// Any failure, including an empty reply, leaves the memory untouched.
    /// The soft limit is passed to the oracle, not enforced here.
    pub async fn consolidate(&self, profile: &mut Profile, new_event: &str) -> MemoryOutcome {
        let prompt = prompts::memory_consolidation(profile, new_event, self.soft_limit_chars);

        match self.oracle.try_call(OracleRole::Biographer, &prompt).await {
            Ok(text) => {
                let cleaned = text.replace("```", "");
                let cleaned = cleaned.trim();
                if cleaned.is_empty() {
                    warn!(profile = %profile.id, "Empty memory consolidation, keeping previous");
                    return MemoryOutcome::Retained;
                }
                debug!(
                    profile = %profile.id,
                    chars = cleaned.chars().count(),
                    soft_limit = self.soft_limit_chars,
                    "Long-term memory updated"
                );
                profile.long_term_memory = cleaned.to_string();
                MemoryOutcome::Updated
            }
            Err(e) => {
                warn!(profile = %profile.id, error = %e, "Memory consolidation failed, keeping previous");
                MemoryOutcome::Retained
            }
        }
    }
}
