//! Turn results and their side-effect log.

use lifesim_core::destiny::DestinyClass;
use lifesim_core::scenario::RepairKind;
use lifesim_core::types::Profile;
use serde::Serialize;

use crate::memory::MemoryOutcome;
use crate::npc_evolution::NpcUpdate;

/// One step of a turn, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Macro backdrop resolved for `year`.
    MacroEvent {
        /// Calendar year.
        year: i32,
        /// One-sentence description.
        text: String,
    },
    /// Destiny rolled.
    Destiny {
        /// Uniform value drawn.
        roll: f64,
        /// Resulting class.
        class: DestinyClass,
    },
    /// Judge's verdict on the submitted choice.
    Outcome {
        /// Choice being judged.
        choice: String,
        /// Verdict text.
        verdict: String,
    },
    /// One NPC evolved.
    Npc(NpcUpdate),
    /// Narrative received and repaired.
    Narrative {
        /// Which repair stage produced the scenario.
        repair: RepairKind,
    },
    /// Time advanced.
    Aged {
        /// Years added.
        years: u32,
        /// Age afterwards.
        age: u32,
        /// Energy afterwards.
        energy: u32,
    },
    /// New choice menu.
    Choices {
        /// Exactly three options.
        options: Vec<String>,
    },
    /// Long-term memory step.
    Memory {
        /// Whether the memory changed.
        outcome: MemoryOutcome,
    },
}

/// A profile after a storage-free turn, plus what happened along the way.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The new profile snapshot.
    pub profile: Profile,
    /// Ordered side-effect log.
    pub log: Vec<TurnEvent>,
}

impl TurnOutcome {
    /// The destiny class rolled this turn, if any.
    #[must_use]
    pub fn destiny(&self) -> Option<DestinyClass> {
        self.log.iter().find_map(|e| match e {
            TurnEvent::Destiny { class, .. } => Some(*class),
            _ => None,
        })
    }

    /// Repair stage of the narrative, if one was requested.
    #[must_use]
    pub fn repair(&self) -> Option<RepairKind> {
        self.log.iter().find_map(|e| match e {
            TurnEvent::Narrative { repair } => Some(*repair),
            _ => None,
        })
    }
}
