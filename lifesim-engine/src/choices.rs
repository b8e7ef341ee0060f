//! Choice menus, probe questions and personality analysis.
//!
//! All three ask the oracle for structured output and normalise whatever
//! comes back, so callers always get a usable value.

use std::collections::BTreeMap;
use std::sync::Arc;

use lifesim_core::types::Profile;
use lifesim_llm::OracleRole;
use serde_json::Value;
use tracing::{debug, warn};

use crate::prompts;
use crate::Oracle;

/// Number of options on every menu.
pub const MENU_SIZE: usize = 3;

/// Padding used when the oracle supplies fewer than three options.
pub const DEFAULT_CHOICES: [&str; MENU_SIZE] = ["继续专注于工作", "多花时间陪陪家人", "尝试发展副业"];

/// Probe questions used when the oracle supplies none.
pub const DEFAULT_PROBES: [&str; 3] = [
    "如果你必须在金钱和自由之间二选一，你会选什么？为什么？",
    "现在的你是在追求梦想，还是在逃避现实？",
    "你认为什么样的人生才算没有虚度？",
];

/// Trait scores applied when the personality analysis cannot be parsed.
pub const DEFAULT_TRAITS: [(&str, i64); 2] = [("Openness", 50), ("Resilience", 50)];

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Extract a list of strings from a JSON array, or from the array under
/// `key` when the value is an object.
fn string_list(raw: &str, key: &str) -> Vec<String> {
    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(mut map)) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Normalise a menu to exactly [`MENU_SIZE`] distinct entries: trim, drop
/// empties and duplicates, truncate, then pad from [`DEFAULT_CHOICES`].
#[must_use]
pub fn normalize_choices(candidates: Vec<String>) -> Vec<String> {
    let mut menu: Vec<String> = Vec::with_capacity(MENU_SIZE);
    for choice in candidates {
        let choice = choice.trim();
        if !choice.is_empty() && !menu.iter().any(|c| c == choice) {
            menu.push(choice.to_string());
        }
        if menu.len() == MENU_SIZE {
            return menu;
        }
    }
    for fallback in DEFAULT_CHOICES {
        if menu.len() == MENU_SIZE {
            break;
        }
        if !menu.iter().any(|c| c == fallback) {
            menu.push(fallback.to_string());
        }
    }
    menu
}

/// Parse a choice-menu reply into exactly three options.
#[must_use]
pub fn parse_choices(raw: &str) -> Vec<String> {
    normalize_choices(string_list(raw, "choices"))
}

/// Parse a probe reply; falls back to [`DEFAULT_PROBES`] when empty.
#[must_use]
pub fn parse_probes(raw: &str) -> Vec<String> {
    let probes = string_list(raw, "probes");
    if probes.is_empty() {
        DEFAULT_PROBES.iter().map(|p| (*p).to_string()).collect()
    } else {
        probes
    }
}

/// Parsed personality analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalityAnalysis {
    /// Raw (unclamped) scores.
    pub traits: BTreeMap<String, i64>,
    /// Values in reply order.
    pub core_values: Vec<String>,
}

impl PersonalityAnalysis {
    /// Parse `{"personalityTraits": {...}, "coreValues": [...]}`. `None` when
    /// the reply is not a JSON object.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(raw) else {
            return None;
        };

        let mut analysis = Self::default();
        if let Some(Value::Object(traits)) = map.remove("personalityTraits") {
            for (name, score) in traits {
                #[allow(clippy::cast_possible_truncation)]
                let score = score
                    .as_i64()
                    .or_else(|| score.as_f64().map(|f| f.round() as i64))
                    .or_else(|| score.as_str().and_then(|s| s.trim().parse().ok()));
                if let Some(score) = score {
                    analysis.traits.insert(name, score);
                }
            }
        }
        if let Some(Value::Array(values)) = map.remove("coreValues") {
            analysis.core_values = values
                .into_iter()
                .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
                .filter(|s| !s.is_empty())
                .collect();
        }
        Some(analysis)
    }

    /// The fixed fallback analysis.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            traits: DEFAULT_TRAITS
                .iter()
                .map(|(name, score)| ((*name).to_string(), *score))
                .collect(),
            core_values: Vec::new(),
        }
    }

    /// Write into the profile, clamping scores and skipping duplicate values.
    pub fn apply_to(&self, profile: &mut Profile) {
        for (name, score) in &self.traits {
            profile.set_trait(name.clone(), *score);
        }
        for value in &self.core_values {
            profile.add_core_value(value.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Oracle-backed generation
// ---------------------------------------------------------------------------

/// Generates menus, probes and analyses through the oracle.
#[derive(Debug, Clone)]
pub struct ChoiceGenerator {
    oracle: Arc<Oracle>,
}

impl ChoiceGenerator {
    /// Create over a shared oracle.
    #[must_use]
    pub fn new(oracle: Arc<Oracle>) -> Self {
        Self { oracle }
    }

    /// Exactly three next-step options for `context`.
    pub async fn choices(&self, profile: &Profile, context: &str) -> Vec<String> {
        let raw = self
            .oracle
            .call_structured(OracleRole::GameDesigner, &prompts::choices(profile, context))
            .await;
        let menu = parse_choices(&raw);
        debug!(profile = %profile.id, choices = ?menu, "Choices generated");
        menu
    }

    /// Probe questions for a drafting profile.
    pub async fn probes(&self, profile: &Profile) -> Vec<String> {
        let raw = self
            .oracle
            .call_structured(OracleRole::Psychologist, &prompts::probes(profile))
            .await;
        parse_probes(&raw)
    }

    /// Personality analysis of the probe answers, or the fixed fallback.
    pub async fn analyze(&self, profile: &Profile, answers: &[(String, String)]) -> PersonalityAnalysis {
        let raw = self
            .oracle
            .call_structured(OracleRole::Psychologist, &prompts::probe_analysis(profile, answers))
            .await;
        PersonalityAnalysis::parse(&raw).unwrap_or_else(|| {
            warn!(profile = %profile.id, "Personality analysis unparseable, using defaults");
            PersonalityAnalysis::fallback()
        })
    }
}
