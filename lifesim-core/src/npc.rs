//! Supporting characters and their status model.
//!
//! NPC status only ever moves toward worse outcomes on its own
//! (`Healthy → Sick → Dead`). Classification of free-text situation updates
//! is a pluggable [`StatusClassifier`]; [`KeywordStatusClassifier`] is the
//! default strategy.

use serde::{Deserialize, Serialize};

/// Relation of an NPC to the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NpcRelation {
    /// Father.
    Father,
    /// Mother.
    Mother,
    /// Spouse or partner.
    Partner,
    /// Friend.
    Friend,
    /// Son or daughter.
    Child,
    /// Parent of a legacy child (the previous generation's protagonist).
    Parent,
    /// Brother or sister.
    Sibling,
    /// Co-worker.
    Colleague,
    /// Anything else.
    #[serde(other)]
    Other,
}

/// Life status of an NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NpcStatus {
    /// Well.
    #[default]
    Healthy,
    /// Ill or hospitalised.
    Sick,
    /// Deceased. Terminal.
    Dead,
    /// Retired.
    Retired,
    /// Wealthy.
    Rich,
    /// Struggling financially.
    Poor,
}

impl NpcStatus {
    /// Health severity: 0 for any living-and-well status, 1 for sick, 2 for dead.
    #[must_use]
    pub fn severity(self) -> u8 {
        match self {
            Self::Healthy | Self::Retired | Self::Rich | Self::Poor => 0,
            Self::Sick => 1,
            Self::Dead => 2,
        }
    }

    /// Apply a classified status, keeping the current one unless the
    /// candidate is strictly more severe.
    #[must_use]
    pub fn worsen_to(self, candidate: Self) -> Self {
        if candidate.severity() > self.severity() {
            candidate
        } else {
            self
        }
    }

    /// Whether the NPC is dead.
    #[must_use]
    pub fn is_dead(self) -> bool {
        matches!(self, Self::Dead)
    }
}

/// A supporting character owned by a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    /// Display name.
    pub name: String,
    /// Relation to the profile.
    pub relation: NpcRelation,
    /// Age in years.
    pub age: u32,
    /// Current status.
    pub status: NpcStatus,
    /// Closeness to the profile, `0..=100`.
    pub intimacy: u8,
    /// Short free-text description of what they are up to.
    #[serde(default)]
    pub current_situation: String,
}

impl Npc {
    /// Create an NPC with healthy status.
    #[must_use]
    pub fn new(name: impl Into<String>, relation: NpcRelation, age: u32, intimacy: u8) -> Self {
        Self {
            name: name.into(),
            relation,
            age,
            status: NpcStatus::Healthy,
            intimacy: intimacy.min(100),
            current_situation: String::new(),
        }
    }

    /// Builder-style situation setter.
    #[must_use]
    pub fn with_situation(mut self, situation: impl Into<String>) -> Self {
        self.current_situation = situation.into();
        self
    }

    /// Builder-style status setter.
    #[must_use]
    pub fn with_status(mut self, status: NpcStatus) -> Self {
        self.status = status;
        self
    }

    /// Record a situation update and reclassify status monotonically.
    pub fn apply_update(&mut self, situation: String, classifier: &dyn StatusClassifier) {
        if let Some(candidate) = classifier.classify(&situation) {
            self.status = self.status.worsen_to(candidate);
        }
        self.current_situation = situation;
    }
}

/// The two default NPCs every fresh profile starts with.
#[must_use]
pub fn default_parents(profile_age: u32) -> Vec<Npc> {
    vec![
        Npc::new("父亲", NpcRelation::Father, profile_age + 25, 80)
            .with_situation("依然在为家庭操劳，偶尔抱怨腰疼。"),
        Npc::new("母亲", NpcRelation::Mother, profile_age + 24, 85)
            .with_situation("每天操持家务，最担心你的终身大事。"),
    ]
}

// ---------------------------------------------------------------------------
// Status classification
// ---------------------------------------------------------------------------

/// Maps a free-text situation update to a status, if the text implies one.
pub trait StatusClassifier: Send + Sync {
    /// Return the status implied by `situation`, or `None` when the text says
    /// nothing about health.
    fn classify(&self, situation: &str) -> Option<NpcStatus>;
}

/// Substring-matching classifier. Death keywords win over sickness keywords.
#[derive(Debug, Clone)]
pub struct KeywordStatusClassifier {
    death_keywords: Vec<String>,
    sickness_keywords: Vec<String>,
}

impl KeywordStatusClassifier {
    /// Build a classifier from custom keyword lists.
    #[must_use]
    pub fn new(death_keywords: Vec<String>, sickness_keywords: Vec<String>) -> Self {
        Self {
            death_keywords,
            sickness_keywords,
        }
    }
}

impl Default for KeywordStatusClassifier {
    fn default() -> Self {
        Self::new(
            ["去世", "死", "逝"].map(String::from).to_vec(),
            ["病", "住院"].map(String::from).to_vec(),
        )
    }
}

impl StatusClassifier for KeywordStatusClassifier {
    fn classify(&self, situation: &str) -> Option<NpcStatus> {
        if self.death_keywords.iter().any(|k| situation.contains(k.as_str())) {
            Some(NpcStatus::Dead)
        } else if self.sickness_keywords.iter().any(|k| situation.contains(k.as_str())) {
            Some(NpcStatus::Sick)
        } else {
            None
        }
    }
}

/// Truncate to at most `max_chars` Unicode scalar values.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_classifier_prefers_death() {
        let c = KeywordStatusClassifier::default();
        assert_eq!(c.classify("因病去世"), Some(NpcStatus::Dead));
        assert_eq!(c.classify("住院观察一周"), Some(NpcStatus::Sick));
        assert_eq!(c.classify("升职加薪"), None);
    }

    #[test]
    fn status_never_improves_automatically() {
        let c = KeywordStatusClassifier::default();
        let mut npc = Npc::new("父亲", NpcRelation::Father, 50, 80);

        npc.apply_update("住院了".into(), &c);
        assert_eq!(npc.status, NpcStatus::Sick);

        npc.apply_update("精神矍铄，身体康复".into(), &c);
        assert_eq!(npc.status, NpcStatus::Sick, "SICK must not return to HEALTHY");

        npc.apply_update("不幸去世".into(), &c);
        assert_eq!(npc.status, NpcStatus::Dead);

        npc.apply_update("又生病了".into(), &c);
        assert_eq!(npc.status, NpcStatus::Dead, "DEAD is terminal");
    }

    #[test]
    fn retired_npc_can_still_fall_ill() {
        let c = KeywordStatusClassifier::default();
        let mut npc = Npc::new("老张", NpcRelation::Parent, 70, 60).with_status(NpcStatus::Retired);
        npc.apply_update("下棋聊天".into(), &c);
        assert_eq!(npc.status, NpcStatus::Retired);
        npc.apply_update("旧病复发".into(), &c);
        assert_eq!(npc.status, NpcStatus::Sick);
    }

    #[test]
    fn default_parents_are_older_than_profile() {
        let parents = default_parents(20);
        assert_eq!(parents.len(), 2);
        assert_eq!(parents[0].relation, NpcRelation::Father);
        assert_eq!(parents[0].age, 45);
        assert_eq!(parents[1].age, 44);
        assert!(parents.iter().all(|p| p.status == NpcStatus::Healthy));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("一二三四五", 3), "一二三");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }

    #[test]
    fn unknown_relation_deserializes_as_other() {
        let relation: NpcRelation = serde_json::from_str("\"MENTOR\"").expect("parse");
        assert_eq!(relation, NpcRelation::Other);
    }
}
