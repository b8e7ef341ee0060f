//! The turn state machine.
//!
//! [`SimulationOrchestrator`] owns every engine component and drives a
//! profile through `Drafting → AnsweringProbes → Active → Concluded`.
//!
//! Turns are split in two layers:
//!
//! - [`SimulationOrchestrator::advance_year`] and
//!   [`SimulationOrchestrator::advance_years`] are storage-free: they take a
//!   profile snapshot and return the next one plus a [`TurnEvent`] log.
//! - [`SimulationOrchestrator::simulate_year`] and
//!   [`SimulationOrchestrator::skip_years`] load under the profile lock, run
//!   the pure step and persist the result exactly once. An error before the
//!   save leaves storage untouched.

use std::sync::Arc;
use std::time::Instant;

use lifesim_core::checkpoint::{Checkpoint, CheckpointStore};
use lifesim_core::config::{LifeSimConfig, SimulationConfig, StorageBackend};
use lifesim_core::destiny::DestinyRoller;
use lifesim_core::legacy::spawn_heir;
use lifesim_core::npc::{default_parents, KeywordStatusClassifier, StatusClassifier};
use lifesim_core::persistence::{InMemoryStore, ProfileRepository, SqliteStore, Store};
use lifesim_core::scenario::{repair_scenario, ScenarioDefaults};
use lifesim_core::types::{EventTag, LifeHistoryEntry, Profile, ProfileId, ProfilePhase};
use lifesim_core::CoreError;
use lifesim_llm::{HttpTransport, OracleClient, OracleRole, Transport};
use tracing::{debug, info, warn};

use crate::choices::ChoiceGenerator;
use crate::destiny::DestinyEngine;
use crate::error::{EngineError, Result};
use crate::locks::ProfileLocks;
use crate::memory::MemoryConsolidator;
use crate::npc_evolution::NpcEvolution;
use crate::prompts::{self, YearInputs};
use crate::turn::{TurnEvent, TurnOutcome};
use crate::world::WorldContext;
use crate::Oracle;

/// Fail with [`CoreError::InvalidPhase`] unless the profile is in one of
/// `accepted`.
fn require_phase(profile: &Profile, accepted: &[ProfilePhase], expected: &'static str) -> Result<()> {
    if accepted.contains(&profile.phase) {
        Ok(())
    } else {
        Err(CoreError::InvalidPhase {
            profile: profile.id.clone(),
            expected,
            actual: profile.phase,
        }
        .into())
    }
}

/// Drives profiles through their lifecycle against a store and an oracle.
pub struct SimulationOrchestrator {
    settings: SimulationConfig,
    oracle: Arc<Oracle>,
    store: Arc<dyn Store>,
    checkpoints: CheckpointStore,
    locks: ProfileLocks,
    world: WorldContext,
    destiny: DestinyEngine,
    npcs: NpcEvolution,
    memory: MemoryConsolidator,
    choices: ChoiceGenerator,
}

impl std::fmt::Debug for SimulationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationOrchestrator")
            .field("settings", &self.settings)
            .field("oracle", &self.oracle)
            .field("locked_profiles", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl SimulationOrchestrator {
    /// Wire every component over a shared oracle and store.
    ///
    /// Destiny rolls draw from OS entropy and NPC status uses the keyword
    /// classifier; see [`Self::with_roller`] and [`Self::with_classifier`].
    #[must_use]
    pub fn new(config: &LifeSimConfig, oracle: Arc<Oracle>, store: Arc<dyn Store>) -> Self {
        let settings = config.simulation.clone();
        Self {
            checkpoints: CheckpointStore::new(store.clone(), config.checkpoint.clone()),
            locks: ProfileLocks::new(),
            world: WorldContext::new(oracle.clone()),
            destiny: DestinyEngine::new(oracle.clone(), DestinyRoller::from_entropy()),
            npcs: NpcEvolution::new(
                oracle.clone(),
                Arc::new(KeywordStatusClassifier::default()),
                settings.npc_situation_max_chars,
            ),
            memory: MemoryConsolidator::new(oracle.clone(), config.memory.soft_limit_chars),
            choices: ChoiceGenerator::new(oracle.clone()),
            settings,
            oracle,
            store,
        }
    }

    /// Build the HTTP oracle and the configured storage backend.
    ///
    /// # Errors
    /// Oracle configuration errors, or a SQLite database that cannot be
    /// opened.
    pub fn from_config(config: &LifeSimConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config.oracle)?);
        let oracle = Arc::new(OracleClient::new(transport, &config.oracle));

        let store: Arc<dyn Store> = match config.persistence.backend {
            StorageBackend::Sqlite => {
                Arc::new(SqliteStore::open(&config.persistence.path, &config.persistence)?)
            }
            StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        };

        info!(backend = ?config.persistence.backend, model = %config.oracle.model, "Orchestrator ready");
        Ok(Self::new(config, oracle, store))
    }

    /// Replace the destiny random source, e.g. with a seeded one.
    #[must_use]
    pub fn with_roller(mut self, roller: DestinyRoller) -> Self {
        self.destiny = DestinyEngine::new(self.oracle.clone(), roller);
        self
    }

    /// Replace the NPC status classification strategy.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn StatusClassifier>) -> Self {
        self.npcs = NpcEvolution::new(
            self.oracle.clone(),
            classifier,
            self.settings.npc_situation_max_chars,
        );
        self
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Load a profile.
    ///
    /// # Errors
    /// [`CoreError::ProfileNotFound`] or a storage failure.
    pub fn profile(&self, id: &ProfileId) -> Result<Profile> {
        Ok(self.store.require_profile(id)?)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Persist a new profile in `Drafting`, assigning an id if it has none.
    ///
    /// # Errors
    /// [`EngineError::InvalidInput`] when a profile with the draft's id
    /// already exists, or storage failure.
    pub async fn create_profile(&self, draft: Profile) -> Result<Profile> {
        let mut profile = draft;
        if profile.id.as_str().is_empty() {
            profile.id = ProfileId::generate();
        }
        let _guard = self.locks.acquire(&profile.id).await;
        if self.store.load_profile(&profile.id)?.is_some() {
            warn!(profile = %profile.id, "Refusing to overwrite existing profile");
            return Err(EngineError::InvalidInput(format!(
                "profile {} already exists",
                profile.id
            )));
        }
        profile.phase = ProfilePhase::Drafting;
        profile.current_age = profile.basic_info.start_age;

        self.store.save_profile(&profile)?;
        info!(profile = %profile.id, age = profile.current_age, "Profile created");
        Ok(profile)
    }

    /// Ask the oracle for personality probe questions.
    ///
    /// # Errors
    /// Missing profile, wrong phase or storage failure. Oracle trouble
    /// yields the default questions instead.
    pub async fn generate_probes(&self, id: &ProfileId) -> Result<Vec<String>> {
        let _guard = self.locks.acquire(id).await;
        let mut profile = self.store.require_profile(id)?;
        require_phase(
            &profile,
            &[ProfilePhase::Drafting, ProfilePhase::AnsweringProbes],
            "Drafting or AnsweringProbes",
        )?;

        let probes = self.choices.probes(&profile).await;
        profile.phase = ProfilePhase::AnsweringProbes;
        self.store.save_profile(&profile)?;
        debug!(profile = %id, count = probes.len(), "Probes issued");
        Ok(probes)
    }

    /// Analyse the probe answers, narrate the opening and activate the
    /// profile.
    ///
    /// # Errors
    /// Missing profile, wrong phase or storage failure.
    pub async fn start(&self, id: &ProfileId, answers: &[(String, String)]) -> Result<Profile> {
        let _guard = self.locks.acquire(id).await;
        let mut profile = self.store.require_profile(id)?;
        require_phase(
            &profile,
            &[ProfilePhase::Drafting, ProfilePhase::AnsweringProbes],
            "Drafting or AnsweringProbes",
        )?;

        self.choices.analyze(&profile, answers).await.apply_to(&mut profile);

        let raw = self
            .oracle
            .call_structured(OracleRole::Narrator, &prompts::opening(&profile))
            .await;
        let (scenario, repair) = repair_scenario(&raw, &ScenarioDefaults::OPENING);
        debug!(profile = %id, ?repair, "Opening narrated");

        if profile.npcs.is_empty() {
            profile.npcs = default_parents(profile.current_age);
        }
        profile.available_choices = self.choices.choices(&profile, &scenario.event).await;
        profile.current_scenario = scenario;
        profile.phase = ProfilePhase::Active;

        self.persist(&profile)?;
        info!(profile = %id, age = profile.current_age, "Simulation started");
        Ok(profile)
    }

    // -----------------------------------------------------------------------
    // Turns
    // -----------------------------------------------------------------------

    /// Play one year on an active profile without touching storage.
    ///
    /// An empty `choice` is replaced by the configured default choice.
    ///
    /// # Errors
    /// [`CoreError::InvalidPhase`] unless the profile is active. Oracle
    /// failures never abort the turn.
    pub async fn advance_year(&self, mut profile: Profile, choice: &str) -> Result<TurnOutcome> {
        require_phase(&profile, &[ProfilePhase::Active], "Active")?;
        let choice = if choice.trim().is_empty() {
            self.settings.default_choice.as_str()
        } else {
            choice.trim()
        };
        let mut log = Vec::new();

        let year = profile.calendar_year(self.settings.base_year);
        let macro_event = self.world.macro_event(year).await;
        log.push(TurnEvent::MacroEvent {
            year,
            text: macro_event.clone(),
        });

        let (roll, class) = self.destiny.trigger_random_event();
        log.push(TurnEvent::Destiny { roll, class });
        let verdict = self.destiny.determine_outcome(&profile, choice, &macro_event).await;
        log.push(TurnEvent::Outcome {
            choice: choice.to_string(),
            verdict: verdict.clone(),
        });

        log.extend(self.npcs.evolve(&mut profile).await.into_iter().map(TurnEvent::Npc));

        let prompt = prompts::yearly(
            &profile,
            &YearInputs {
                year,
                macro_event: &macro_event,
                destiny: class,
                outcome: &verdict,
                choice,
            },
        );
        let raw = self.oracle.call_structured(OracleRole::Narrator, &prompt).await;
        let (scenario, repair) = repair_scenario(&raw, &ScenarioDefaults::YEARLY);
        log.push(TurnEvent::Narrative { repair });

        profile.current_age += 1;
        profile.life_history.push(LifeHistoryEntry {
            age: profile.current_age,
            event_description: scenario.to_json_string(),
            event_type: EventTag::Destiny(class),
            impact_analysis: Some(verdict),
        });
        profile.health_status.drain_energy();
        log.push(TurnEvent::Aged {
            years: 1,
            age: profile.current_age,
            energy: profile.health_status.energy_level,
        });

        let narrative = scenario.event.clone();
        profile.current_scenario = scenario;
        self.finish_turn(&mut profile, &narrative, &mut log).await;

        Ok(TurnOutcome { profile, log })
    }

    /// Fast-forward `years` years with one montage narrative, without
    /// touching storage. Zero years returns the profile unchanged.
    ///
    /// # Errors
    /// [`CoreError::InvalidPhase`] unless active, or
    /// [`EngineError::InvalidInput`] when a maximum is configured and
    /// `years` exceeds it.
    pub async fn advance_years(&self, mut profile: Profile, years: u32) -> Result<TurnOutcome> {
        require_phase(&profile, &[ProfilePhase::Active], "Active")?;
        if let Some(max) = self.settings.max_skip_years
            && years > max
        {
            return Err(EngineError::InvalidInput(format!(
                "cannot skip {years} years, maximum is {max}"
            )));
        }
        if years == 0 {
            return Ok(TurnOutcome {
                profile,
                log: Vec::new(),
            });
        }

        let mut log = Vec::new();
        for _ in 0..years {
            profile.current_age += 1;
            profile.health_status.drain_energy();
        }
        for npc in &mut profile.npcs {
            npc.age += years;
        }
        log.push(TurnEvent::Aged {
            years,
            age: profile.current_age,
            energy: profile.health_status.energy_level,
        });

        let raw = self
            .oracle
            .call_structured(OracleRole::Narrator, &prompts::skip_years(&profile, years))
            .await;
        let (scenario, repair) = repair_scenario(&raw, &ScenarioDefaults::SKIP);
        log.push(TurnEvent::Narrative { repair });

        profile.life_history.push(LifeHistoryEntry {
            age: profile.current_age,
            event_description: scenario.to_json_string(),
            event_type: EventTag::Skip,
            impact_analysis: None,
        });

        let narrative = scenario.event.clone();
        profile.current_scenario = scenario;
        self.finish_turn(&mut profile, &narrative, &mut log).await;

        Ok(TurnOutcome { profile, log })
    }

    /// Load, play one year and persist it.
    ///
    /// # Errors
    /// Missing profile, wrong phase or storage failure.
    pub async fn simulate_year(&self, id: &ProfileId, choice: &str) -> Result<TurnOutcome> {
        let _guard = self.locks.acquire(id).await;
        let started = Instant::now();
        let profile = self.store.require_profile(id)?;

        let outcome = self.advance_year(profile, choice).await?;
        self.persist(&outcome.profile)?;

        info!(
            profile = %id,
            age = outcome.profile.current_age,
            destiny = ?outcome.destiny(),
            repair = ?outcome.repair(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Year simulated"
        );
        Ok(outcome)
    }

    /// Load, skip `years` years and persist. Zero years persists nothing.
    ///
    /// # Errors
    /// Missing profile, wrong phase, too many years or storage failure.
    pub async fn skip_years(&self, id: &ProfileId, years: u32) -> Result<TurnOutcome> {
        let _guard = self.locks.acquire(id).await;
        let started = Instant::now();
        let profile = self.store.require_profile(id)?;

        let outcome = self.advance_years(profile, years).await?;
        if years > 0 {
            self.persist(&outcome.profile)?;
        }

        info!(
            profile = %id,
            years,
            age = outcome.profile.current_age,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Years skipped"
        );
        Ok(outcome)
    }

    /// Conclude an active life and persist its heir in `Drafting`.
    ///
    /// # Errors
    /// Missing profile, wrong phase or storage failure.
    pub async fn create_legacy(&self, parent_id: &ProfileId) -> Result<Profile> {
        let _guard = self.locks.acquire(parent_id).await;
        let mut parent = self.store.require_profile(parent_id)?;
        require_phase(&parent, &[ProfilePhase::Active], "Active")?;

        let child = spawn_heir(&parent);
        self.store.save_profile(&child)?;
        parent.phase = ProfilePhase::Concluded;
        self.store.save_profile(&parent)?;

        info!(
            parent = %parent_id,
            child = %child.id,
            generation = child.generation,
            savings = child.economic_status.savings,
            "Legacy created"
        );
        Ok(child)
    }

    /// Delete a profile. Its checkpoints survive for rollback.
    ///
    /// # Errors
    /// Storage failure.
    pub async fn delete_profile(&self, id: &ProfileId) -> Result<bool> {
        let removed = {
            let _guard = self.locks.acquire(id).await;
            self.store.delete_profile(id)?
        };
        self.locks.forget(id);
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Checkpoints
    // -----------------------------------------------------------------------

    /// Snapshot a stored profile now.
    ///
    /// # Errors
    /// Missing profile or storage failure.
    pub async fn create_checkpoint(&self, id: &ProfileId) -> Result<u64> {
        let _guard = self.locks.acquire(id).await;
        let profile = self.store.require_profile(id)?;
        Ok(self.checkpoints.try_create_checkpoint(&profile)?)
    }

    /// Restore the most recent snapshot taken at `age`.
    ///
    /// # Errors
    /// [`CoreError::CheckpointNotFound`] when no snapshot exists at that age.
    pub async fn rollback(&self, id: &ProfileId, age: u32) -> Result<Profile> {
        let _guard = self.locks.acquire(id).await;
        Ok(self.checkpoints.rollback(id, age)?)
    }

    /// Snapshots of a profile, highest age first.
    ///
    /// # Errors
    /// Storage failure.
    pub fn checkpoint_history(&self, id: &ProfileId) -> Result<Vec<Checkpoint>> {
        Ok(self.checkpoints.history(id)?)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Regenerate the menu and consolidate memory from `narrative`.
    async fn finish_turn(&self, profile: &mut Profile, narrative: &str, log: &mut Vec<TurnEvent>) {
        profile.available_choices = self.choices.choices(profile, narrative).await;
        log.push(TurnEvent::Choices {
            options: profile.available_choices.clone(),
        });

        let outcome = self.memory.consolidate(profile, narrative).await;
        log.push(TurnEvent::Memory { outcome });
    }

    /// The single write of a turn, followed by the automatic snapshot.
    fn persist(&self, profile: &Profile) -> Result<()> {
        self.store.save_profile(profile)?;
        if self.settings.auto_checkpoint {
            self.checkpoints.create_checkpoint(profile);
        }
        Ok(())
    }
}
