//! Destiny classification: the yearly roll of fate.
//!
//! A single uniform value `r ∈ [0, 1)` is mapped onto five fixed,
//! non-overlapping bands:
//!
//! | Band            | Range                 |
//! |-----------------|-----------------------|
//! | Rare disaster   | `r < 0.001`           |
//! | Minor setback   | `0.001 ≤ r < 0.1`     |
//! | Ordinary        | `0.1 ≤ r ≤ 0.9`       |
//! | Minor fortune   | `0.9 < r ≤ 0.999`     |
//! | Rare miracle    | `r > 0.999`           |
//!
//! Classification is a pure function of `r`. Randomness lives in
//! [`DestinyRoller`], an explicit seedable generator owned by whoever drives
//! the turn.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Upper bound (exclusive) of the rare-disaster band.
pub const RARE_DISASTER_BELOW: f64 = 0.001;
/// Upper bound (exclusive) of the minor-setback band.
pub const MINOR_SETBACK_BELOW: f64 = 0.1;
/// Upper bound (inclusive) of the ordinary band.
pub const ORDINARY_UP_TO: f64 = 0.9;
/// Upper bound (inclusive) of the minor-fortune band.
pub const MINOR_FORTUNE_UP_TO: f64 = 0.999;

/// The five destiny bands. Serialised by their narrative labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestinyClass {
    /// Black swan: catastrophe.
    #[serde(rename = "黑天鹅-灾难")]
    RareDisaster,
    /// A small setback.
    #[serde(rename = "小挫折")]
    MinorSetback,
    /// Nothing remarkable.
    #[serde(rename = "平淡")]
    Ordinary,
    /// A small stroke of luck.
    #[serde(rename = "小确幸")]
    MinorFortune,
    /// Black swan: miracle.
    #[serde(rename = "黑天鹅-奇迹")]
    RareMiracle,
}

impl DestinyClass {
    /// All bands, from worst to best.
    pub const ALL: [Self; 5] = [
        Self::RareDisaster,
        Self::MinorSetback,
        Self::Ordinary,
        Self::MinorFortune,
        Self::RareMiracle,
    ];

    /// Classify a roll. NaN is treated as ordinary.
    #[must_use]
    pub fn classify(r: f64) -> Self {
        if r.is_nan() {
            Self::Ordinary
        } else if r < RARE_DISASTER_BELOW {
            Self::RareDisaster
        } else if r < MINOR_SETBACK_BELOW {
            Self::MinorSetback
        } else if r <= ORDINARY_UP_TO {
            Self::Ordinary
        } else if r <= MINOR_FORTUNE_UP_TO {
            Self::MinorFortune
        } else {
            Self::RareMiracle
        }
    }

    /// Narrative label, used in prompts and life-history tags.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::RareDisaster => "黑天鹅-灾难",
            Self::MinorSetback => "小挫折",
            Self::Ordinary => "平淡",
            Self::MinorFortune => "小确幸",
            Self::RareMiracle => "黑天鹅-奇迹",
        }
    }

    /// Reverse of [`label`](Self::label).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.label() == label)
    }
}

impl std::fmt::Display for DestinyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Explicit source of destiny rolls.
///
/// Each roll is independent; the roller keeps no memory of earlier results
/// beyond the generator state itself.
#[derive(Debug, Clone)]
pub struct DestinyRoller {
    rng: StdRng,
}

impl DestinyRoller {
    /// Seeded roller. Identical seeds give identical roll sequences.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Roller seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Draw a uniform value in `[0, 1)`.
    pub fn roll(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Draw a value and classify it.
    pub fn roll_class(&mut self) -> (f64, DestinyClass) {
        let r = self.roll();
        (r, DestinyClass::classify(r))
    }
}

impl Default for DestinyRoller {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_representative_values() {
        assert_eq!(DestinyClass::classify(0.0005), DestinyClass::RareDisaster);
        assert_eq!(DestinyClass::classify(0.05), DestinyClass::MinorSetback);
        assert_eq!(DestinyClass::classify(0.5), DestinyClass::Ordinary);
        assert_eq!(DestinyClass::classify(0.95), DestinyClass::MinorFortune);
        assert_eq!(DestinyClass::classify(0.9995), DestinyClass::RareMiracle);
    }

    #[test]
    fn boundaries_follow_interval_closure() {
        assert_eq!(DestinyClass::classify(0.001), DestinyClass::MinorSetback);
        assert_eq!(DestinyClass::classify(0.1), DestinyClass::Ordinary);
        assert_eq!(DestinyClass::classify(0.9), DestinyClass::Ordinary);
        assert_eq!(DestinyClass::classify(0.999), DestinyClass::MinorFortune);
        assert_eq!(DestinyClass::classify(0.0), DestinyClass::RareDisaster);
    }

    #[test]
    fn labels_round_trip() {
        for class in DestinyClass::ALL {
            assert_eq!(DestinyClass::from_label(class.label()), Some(class));
        }
        assert_eq!(DestinyClass::from_label("跳过"), None);
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&DestinyClass::MinorFortune).expect("serialize");
        assert_eq!(json, "\"小确幸\"");
    }

    #[test]
    fn seeded_rollers_are_reproducible() {
        let mut a = DestinyRoller::seeded(7);
        let mut b = DestinyRoller::seeded(7);
        for _ in 0..32 {
            assert_eq!(a.roll_class(), b.roll_class());
        }
    }

    #[test]
    fn rolls_stay_in_unit_interval() {
        let mut roller = DestinyRoller::seeded(99);
        for _ in 0..1_000 {
            let r = roller.roll();
            assert!((0.0..1.0).contains(&r));
        }
    }
}
