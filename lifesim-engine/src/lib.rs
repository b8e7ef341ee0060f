//! # lifesim-engine: turn orchestration
//!
//! Wires the oracle layer to the data model and drives each simulated year
//! through a fixed sequence:
//!
//! ```text
//! macro event ─► destiny roll ─► outcome judgment ─► NPC evolution
//!      ─► yearly narrative (repaired) ─► age / history / energy
//!      ─► choice menu ─► memory consolidation ─► persist once
//! ```
//!
//! Oracle failures at any step degrade to neutral fallbacks; only missing
//! profiles, invalid phases and storage errors abort an operation.
//!
//! ```rust,no_run
//! use lifesim_core::LifeSimConfig;
//! use lifesim_engine::SimulationOrchestrator;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LifeSimConfig::from_file("lifesim.toml")?;
//! lifesim_engine::telemetry::init_tracing(&config.general);
//! let engine = SimulationOrchestrator::from_config(&config)?;
//! # let id = "p".into();
//! let outcome = engine.simulate_year(&id, "辞职创业").await?;
//! println!("{}", outcome.profile.current_scenario.event);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

pub mod choices;
pub mod destiny;
pub mod error;
pub mod locks;
pub mod memory;
pub mod npc_evolution;
pub mod orchestrator;
pub mod prompts;
pub mod telemetry;
pub mod turn;
pub mod world;

pub use choices::ChoiceGenerator;
pub use destiny::DestinyEngine;
pub use error::EngineError;
pub use locks::ProfileLocks;
pub use memory::{MemoryConsolidator, MemoryOutcome};
pub use npc_evolution::{NpcEvolution, NpcUpdate};
pub use orchestrator::SimulationOrchestrator;
pub use turn::{TurnEvent, TurnOutcome};
pub use world::WorldContext;

/// The oracle client shared by every engine component.
pub type Oracle = lifesim_llm::OracleClient<Arc<dyn lifesim_llm::Transport>>;
