//! Per-year macro narrative.

use std::sync::Arc;

use lifesim_llm::OracleRole;
use tracing::warn;

use crate::prompts;
use crate::Oracle;

/// Returned whenever the oracle cannot produce a macro event.
pub const NEUTRAL_MACRO_EVENT: &str = "这一年宏观环境相对平稳。";

/// Produces the one-sentence world backdrop of each simulated year.
#[derive(Debug, Clone)]
pub struct WorldContext {
    oracle: Arc<Oracle>,
}

impl WorldContext {
    /// Create over a shared oracle.
    #[must_use]
    pub fn new(oracle: Arc<Oracle>) -> Self {
        Self { oracle }
    }

    /// Macro event of `year`. Never fails: any oracle error, including an
    /// exhausted retry budget or an empty reply, yields
    /// [`NEUTRAL_MACRO_EVENT`].
    pub async fn macro_event(&self, year: i32) -> String {
        match self
            .oracle
            .try_call(OracleRole::Historian, &prompts::macro_event(year))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(year, "Empty macro event, using neutral fallback");
                NEUTRAL_MACRO_EVENT.to_string()
            }
            Err(e) => {
                warn!(year, error = %e, "Macro event unavailable, using neutral fallback");
                NEUTRAL_MACRO_EVENT.to_string()
            }
        }
    }
}
