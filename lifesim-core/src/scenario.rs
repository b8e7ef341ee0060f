//! The three-field scenario shape and structured-response repair.
//!
//! Every narrated turn ends with a [`Scenario`] exposing `event`,
//! `status_change` and `relationship_change`, no matter what the oracle
//! returned. [`repair_scenario`] is the single place where raw oracle text
//! is turned into that shape:
//!
//! 1. **Strict**: the text parses as a JSON object; missing fields are
//!    defaulted, unknown fields preserved.
//! 2. **Lenient**: the text is broken JSON (truncated, trailing prose,
//!    unescaped quotes elsewhere) but still carries recognisable
//!    `"event": "..."`-style pairs; those values are lifted out.
//! 3. **Synthesized**: anything else; the raw text becomes the event.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A narrated turn in its guaranteed shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// What happened.
    #[serde(default)]
    pub event: String,
    /// Change in physical and mental state.
    #[serde(default)]
    pub status_change: String,
    /// Change in relationships.
    #[serde(default)]
    pub relationship_change: String,
    /// Any additional fields the oracle produced.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Scenario {
    /// Serialise to a JSON object string, as stored in life history.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.event.clone())
    }
}

/// Placeholder texts used for fields the oracle left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioDefaults {
    /// Event text when none could be recovered.
    pub event: &'static str,
    /// Status change placeholder.
    pub status_change: &'static str,
    /// Relationship change placeholder.
    pub relationship_change: &'static str,
}

impl ScenarioDefaults {
    /// Defaults for the opening narrative.
    pub const OPENING: Self = Self {
        event: "故事从这里开始。",
        status_change: "一切如常",
        relationship_change: "无明显变化",
    };

    /// Defaults for a regular yearly turn.
    pub const YEARLY: Self = Self {
        event: "岁月无声，生活继续。",
        status_change: "无明显变化",
        relationship_change: "一切如常",
    };

    /// Defaults for a multi-year skip.
    pub const SKIP: Self = Self {
        event: "时光飞逝。",
        status_change: "岁月留痕",
        relationship_change: "故人渐远",
    };
}

/// Which repair stage produced the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    /// Parsed as a JSON object.
    Strict,
    /// Recovered field values from malformed JSON.
    Lenient,
    /// Wrapped the raw text.
    Synthesized,
}

const EVENT: &str = "event";
const STATUS_CHANGE: &str = "status_change";
const RELATIONSHIP_CHANGE: &str = "relationship_change";
const NARRATIVE_ALIAS: &str = "narrative";

static FIELD_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(event|narrative|status_change|relationship_change)"\s*:\s*"((?:[^"\\]|\\.)*)"#)
        .expect("field-pair pattern is valid")
});

/// Turn raw oracle output into a [`Scenario`]. Never fails.
#[must_use]
pub fn repair_scenario(raw: &str, defaults: &ScenarioDefaults) -> (Scenario, RepairKind) {
    let text = raw.trim();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return (from_object(map, defaults), RepairKind::Strict);
    }

    if let Some(scenario) = lenient_extract(text, defaults) {
        return (scenario, RepairKind::Lenient);
    }

    (synthesize(text, defaults), RepairKind::Synthesized)
}

fn from_object(mut map: Map<String, Value>, defaults: &ScenarioDefaults) -> Scenario {
    let status_change = take_text(&mut map, STATUS_CHANGE).unwrap_or_else(|| defaults.status_change.to_string());
    let relationship_change =
        take_text(&mut map, RELATIONSHIP_CHANGE).unwrap_or_else(|| defaults.relationship_change.to_string());

    let event = match take_text(&mut map, EVENT) {
        Some(event) => event,
        None => match map.get(NARRATIVE_ALIAS).and_then(value_text) {
            Some(narrative) => narrative,
            None if !map.is_empty() => Value::Object(map.clone()).to_string(),
            None => defaults.event.to_string(),
        },
    };

    Scenario {
        event,
        status_change,
        relationship_change,
        extra: map,
    }
}

fn take_text(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    map.remove(key).as_ref().and_then(value_text)
}

/// Non-empty textual rendering of a JSON value; `null` and blank strings are absent.
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn lenient_extract(text: &str, defaults: &ScenarioDefaults) -> Option<Scenario> {
    let mut event = None;
    let mut narrative = None;
    let mut status_change = None;
    let mut relationship_change = None;

    for caps in FIELD_PAIR.captures_iter(text) {
        let value = unescape(&caps[2]);
        if value.trim().is_empty() {
            continue;
        }
        let slot = match &caps[1] {
            EVENT => &mut event,
            NARRATIVE_ALIAS => &mut narrative,
            STATUS_CHANGE => &mut status_change,
            _ => &mut relationship_change,
        };
        slot.get_or_insert(value);
    }

    if event.is_none() && narrative.is_none() && status_change.is_none() && relationship_change.is_none() {
        return None;
    }
    Some(Scenario {
        event: event.or(narrative).unwrap_or_else(|| defaults.event.to_string()),
        status_change: status_change.unwrap_or_else(|| defaults.status_change.to_string()),
        relationship_change: relationship_change.unwrap_or_else(|| defaults.relationship_change.to_string()),
        extra: Map::new(),
    })
}

fn unescape(fragment: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{fragment}\"")).unwrap_or_else(|_| fragment.to_string())
}

fn synthesize(text: &str, defaults: &ScenarioDefaults) -> Scenario {
    Scenario {
        event: if text.is_empty() {
            defaults.event.to_string()
        } else {
            text.to_string()
        },
        status_change: defaults.status_change.to_string(),
        relationship_change: defaults.relationship_change.to_string(),
        extra: Map::new(),
    }
}
