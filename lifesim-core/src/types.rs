//! Core type definitions for the simulated life.
//!
//! The [`Profile`] is a single aggregate: it exclusively owns its NPC list and
//! its life history, and is only ever loaded and saved as a whole.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::destiny::DestinyClass;
use crate::npc::Npc;
use crate::scenario::Scenario;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque string identity of a profile.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl ProfileId {
    /// Create a fresh random profile id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProfileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Game settings & lifecycle
// ---------------------------------------------------------------------------

/// Difficulty mode. Changes the tone of narration and the strictness of
/// outcome judgments, never the turn mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Fortune favours the protagonist.
    Easy,
    /// Realistic life.
    #[default]
    Normal,
    /// Setbacks are frequent, success is hard-won.
    Hard,
    /// Survival is the only goal.
    Hell,
}

/// Lifecycle phase of a profile.
///
/// ```text
/// Drafting ──probes──▶ AnsweringProbes ──start──▶ Active ⟲ (turns)
///    └───────────────────start────────────────────▶ │
///                                                    └──legacy──▶ Concluded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfilePhase {
    /// Created, personality not yet probed.
    #[default]
    Drafting,
    /// Probe questions issued, waiting for answers.
    AnsweringProbes,
    /// Turns may be played.
    Active,
    /// A legacy child was spawned; this life is over.
    Concluded,
}

// ---------------------------------------------------------------------------
// Nested profile attributes
// ---------------------------------------------------------------------------

/// Basic personal information.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicInfo {
    /// Display name.
    pub name: String,
    /// Age at which the simulation started.
    pub start_age: u32,
    /// Free-form gender.
    pub gender: Option<String>,
    /// City or region.
    pub location: Option<String>,
    /// Highest education completed.
    pub education_level: Option<String>,
    /// Current occupation.
    pub profession: Option<String>,
    /// Free text describing the life lived before the simulation started.
    pub life_experiences: Option<String>,
}

/// Money matters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EconomicStatus {
    /// Liquid savings.
    pub savings: f64,
    /// Outstanding debt.
    pub debt: f64,
    /// Monthly income.
    pub monthly_income: f64,
    /// Named assets (house, car, ...).
    pub assets: Vec<String>,
}

/// The family the profile was born into.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyBackground {
    /// e.g. "married", "divorced".
    pub parents_status: Option<String>,
    /// e.g. "full support", "independent".
    pub economic_support: Option<String>,
    /// Number of siblings.
    pub sibling_count: u32,
    /// Rough description of family wealth.
    pub family_assets: Option<String>,
    /// Father's occupation.
    pub father_profession: Option<String>,
    /// Mother's occupation.
    pub mother_profession: Option<String>,
}

/// Upper bound of the energy resource.
pub const MAX_ENERGY: u32 = 100;

/// Physical condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthStatus {
    /// Bounded energy resource, `0..=MAX_ENERGY`. Drains one point per year.
    /// Stored values above the bound are clamped on load.
    #[serde(deserialize_with = "clamped_energy")]
    pub energy_level: u32,
    /// Long-running conditions.
    pub chronic_conditions: Vec<String>,
    /// Hereditary risks.
    pub family_history: Option<String>,
}

impl HealthStatus {
    /// Drain one point of energy, never going below zero.
    pub fn drain_energy(&mut self) {
        self.energy_level = self.energy_level.saturating_sub(1);
    }

    /// Set the energy level, clamped to [`MAX_ENERGY`].
    pub fn set_energy(&mut self, level: u32) {
        self.energy_level = level.min(MAX_ENERGY);
    }
}

fn clamped_energy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    u32::deserialize(deserializer).map(|level| level.min(MAX_ENERGY))
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            energy_level: MAX_ENERGY,
            chronic_conditions: Vec::new(),
            family_history: None,
        }
    }
}

/// Social standing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialConnections {
    /// Single, dating, married...
    pub relationship_status: Option<String>,
    /// Quality of the social circle.
    pub social_circle_quality: Option<String>,
}

// ---------------------------------------------------------------------------
// Life history
// ---------------------------------------------------------------------------

/// Tag attached to a life-history entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventTag {
    /// A yearly turn, tagged with the destiny roll of that year.
    Destiny(DestinyClass),
    /// A multi-year skip summarised in one montage.
    Skip,
    /// Any other tag found in stored data.
    Other(String),
}

/// Label used for skip entries.
pub const SKIP_TAG: &str = "跳过";

impl From<String> for EventTag {
    fn from(value: String) -> Self {
        if value == SKIP_TAG {
            return EventTag::Skip;
        }
        match DestinyClass::from_label(&value) {
            Some(class) => EventTag::Destiny(class),
            None => EventTag::Other(value),
        }
    }
}

impl From<EventTag> for String {
    fn from(tag: EventTag) -> Self {
        match tag {
            EventTag::Destiny(class) => class.label().to_string(),
            EventTag::Skip => SKIP_TAG.to_string(),
            EventTag::Other(s) => s,
        }
    }
}

/// One immutable record in a profile's life history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeHistoryEntry {
    /// Age at which the event happened.
    pub age: u32,
    /// Narrative text, usually the serialised scenario of that turn.
    pub event_description: String,
    /// What kind of turn produced this entry.
    pub event_type: EventTag,
    /// Optional analysis of the event's impact on attributes.
    #[serde(default)]
    pub impact_analysis: Option<String>,
}

/// Append-only, insertion-ordered list of [`LifeHistoryEntry`].
///
/// There is deliberately no mutable access to existing entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LifeHistory(Vec<LifeHistoryEntry>);

impl LifeHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the end.
    pub fn push(&mut self, entry: LifeHistoryEntry) {
        self.0.push(entry);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&LifeHistoryEntry> {
        self.0.last()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, LifeHistoryEntry> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a LifeHistory {
    type Item = &'a LifeHistoryEntry;
    type IntoIter = std::slice::Iter<'a, LifeHistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Profile aggregate
// ---------------------------------------------------------------------------

/// The simulated person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    /// Identity.
    pub id: ProfileId,
    /// Difficulty mode.
    pub difficulty: Difficulty,
    /// Lifecycle phase.
    pub phase: ProfilePhase,
    /// Basic personal information.
    pub basic_info: BasicInfo,
    /// Money matters.
    pub economic_status: EconomicStatus,
    /// Family of origin.
    pub family_background: FamilyBackground,
    /// Physical condition.
    pub health_status: HealthStatus,
    /// Social standing.
    pub social_connections: SocialConnections,
    /// Trait name → score in `0..=100`.
    pub personality_traits: BTreeMap<String, u8>,
    /// What the person cares about most.
    pub core_values: Vec<String>,
    /// Unresolved tensions.
    pub inner_conflicts: Vec<String>,
    /// Age in years.
    pub current_age: u32,
    /// Latest narrated scenario, always in the three-field shape.
    pub current_scenario: Scenario,
    /// Rolling compressed biography.
    pub long_term_memory: String,
    /// Menu for the next turn. Exactly three entries once the profile is active.
    pub available_choices: Vec<String>,
    /// 1 for the first life, +1 per legacy.
    pub generation: u32,
    /// Back-reference to the profile this one inherited from. Not ownership.
    pub parent_profile_id: Option<ProfileId>,
    /// Append-only record of turns.
    pub life_history: LifeHistory,
    /// Supporting characters, owned by this profile.
    pub npcs: Vec<Npc>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            id: ProfileId::generate(),
            difficulty: Difficulty::Normal,
            phase: ProfilePhase::Drafting,
            basic_info: BasicInfo::default(),
            economic_status: EconomicStatus::default(),
            family_background: FamilyBackground::default(),
            health_status: HealthStatus::default(),
            social_connections: SocialConnections::default(),
            personality_traits: BTreeMap::new(),
            core_values: Vec::new(),
            inner_conflicts: Vec::new(),
            current_age: 0,
            current_scenario: Scenario::default(),
            long_term_memory: String::new(),
            available_choices: Vec::new(),
            generation: 1,
            parent_profile_id: None,
            life_history: LifeHistory::new(),
            npcs: Vec::new(),
        }
    }
}

impl Profile {
    /// Create a drafting profile from basic info, with age set to the start age.
    #[must_use]
    pub fn draft(basic_info: BasicInfo) -> Self {
        Self {
            current_age: basic_info.start_age,
            basic_info,
            ..Self::default()
        }
    }

    /// Calendar year the profile is currently living, counted from `base_year`
    /// at the start age.
    #[must_use]
    pub fn calendar_year(&self, base_year: i32) -> i32 {
        let elapsed = i64::from(self.current_age) - i64::from(self.basic_info.start_age);
        i32::try_from(i64::from(base_year) + elapsed).unwrap_or(base_year)
    }

    /// Set a personality trait, clamping the score to `0..=100`.
    pub fn set_trait(&mut self, name: impl Into<String>, score: i64) {
        let clamped = u8::try_from(score.clamp(0, 100)).unwrap_or(0);
        self.personality_traits.insert(name.into(), clamped);
    }

    /// Add a core value unless it is already present.
    pub fn add_core_value(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() && !self.core_values.contains(&value) {
            self.core_values.push(value);
        }
    }
}
