//! # LifeSim Core Library
//!
//! Data model and pure logic for a year-by-year narrated life simulation.
//!
//! A [`Profile`] is the simulated person. It owns its supporting characters
//! ([`Npc`]) and an append-only [`LifeHistory`], and moves through the
//! phases `DRAFTING → ANSWERING_PROBES → ACTIVE → CONCLUDED`.
//!
//! Everything here is free of network access:
//!
//! - [`destiny`]: threshold classification of a uniform roll into five
//!   fortune classes, with a seedable roller.
//! - [`scenario`]: repair of raw generator output into the guaranteed
//!   `event` / `status_change` / `relationship_change` shape.
//! - [`npc`]: supporting characters and their monotone status classifier.
//! - [`legacy`]: spawning the next generation from a finished life.
//! - [`checkpoint`]: immutable snapshots and rollback.
//! - [`persistence`]: whole-aggregate repositories (SQLite, in-memory).

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod checkpoint;
pub mod config;
pub mod destiny;
pub mod error;
pub mod legacy;
pub mod npc;
pub mod persistence;
pub mod scenario;
pub mod types;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use config::LifeSimConfig;
pub use destiny::{DestinyClass, DestinyRoller};
pub use error::CoreError;
pub use npc::{Npc, NpcRelation, NpcStatus, StatusClassifier};
pub use scenario::{Scenario, ScenarioDefaults};
pub use types::*;
