//! Destiny rolls and outcome judgments.

use std::sync::Arc;

use lifesim_core::destiny::{DestinyClass, DestinyRoller};
use lifesim_core::types::Profile;
use lifesim_llm::OracleRole;
use parking_lot::Mutex;
use tracing::debug;

use crate::prompts;
use crate::Oracle;

/// Owns the random source for destiny classification and outcome rolls.
///
/// The generator is explicit and seedable; two engines built from the same
/// seed classify identically.
#[derive(Debug)]
pub struct DestinyEngine {
    oracle: Arc<Oracle>,
    roller: Mutex<DestinyRoller>,
}

impl DestinyEngine {
    /// Create with a given roller.
    #[must_use]
    pub fn new(oracle: Arc<Oracle>, roller: DestinyRoller) -> Self {
        Self {
            oracle,
            roller: Mutex::new(roller),
        }
    }

    /// Draw one value and classify it. No memory of earlier rolls.
    pub fn trigger_random_event(&self) -> (f64, DestinyClass) {
        let (r, class) = self.roller.lock().roll_class();
        debug!(roll = r, class = %class, "Destiny rolled");
        (r, class)
    }

    /// Judge the outcome of `action` with an independent second roll.
    ///
    /// The verdict is free text, possibly an inline failure marker, and is
    /// only ever fed into the turn narrative.
    pub async fn determine_outcome(&self, profile: &Profile, action: &str, macro_event: &str) -> String {
        let roll = self.roller.lock().roll();
        let prompt = prompts::destiny_check(profile, action, macro_event, roll);
        self.oracle.call(OracleRole::Judge, &prompt).await
    }
}
