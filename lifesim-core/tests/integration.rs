//! Integration tests: storage, checkpoints and legacy across real backends.

use std::sync::Arc;

use lifesim_core::checkpoint::CheckpointStore;
use lifesim_core::config::{CheckpointConfig, LifeSimConfig, PersistenceConfig};
use lifesim_core::destiny::DestinyClass;
use lifesim_core::legacy::spawn_heir;
use lifesim_core::npc::default_parents;
use lifesim_core::persistence::{CheckpointRepository, ProfileRepository, SqliteStore};
use lifesim_core::scenario::{repair_scenario, ScenarioDefaults};
use lifesim_core::types::{BasicInfo, EventTag, LifeHistoryEntry, Profile, ProfilePhase};
use lifesim_core::CoreError;

fn active_profile() -> Profile {
    let mut profile = Profile::draft(BasicInfo {
        name: "沈一舟".into(),
        start_age: 22,
        location: Some("成都".into()),
        profession: Some("程序员".into()),
        ..BasicInfo::default()
    });
    profile.phase = ProfilePhase::Active;
    profile.economic_status.savings = 20_000.0;
    profile.npcs = default_parents(22);
    profile.set_trait("Openness", 70);
    profile
}

/// Stand-in for one narrated turn, without any generator.
fn fake_turn(profile: &mut Profile, event: &str) {
    let (scenario, _) = repair_scenario(event, &ScenarioDefaults::YEARLY);
    profile.current_age += 1;
    profile.life_history.push(LifeHistoryEntry {
        age: profile.current_age,
        event_description: scenario.to_json_string(),
        event_type: EventTag::Destiny(DestinyClass::Ordinary),
        impact_analysis: None,
    });
    profile.current_scenario = scenario;
    profile.health_status.drain_energy();
    profile.economic_status.savings += 1_000.0;
}

// ---------------------------------------------------------------------------
// Checkpoint rollback on SQLite
// ---------------------------------------------------------------------------

#[test]
fn rollback_after_several_turns_restores_all_scalars() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(
        SqliteStore::open(dir.path().join("rollback.db"), &PersistenceConfig::default())
            .expect("open"),
    );
    let checkpoints = CheckpointStore::new(store.clone(), CheckpointConfig::default());

    let mut profile = active_profile();
    store.save_profile(&profile).expect("save");

    let mut snapshot_at_24 = None;
    for year in 0..5 {
        fake_turn(&mut profile, &format!("第{year}年"));
        store.save_profile(&profile).expect("save");
        checkpoints.create_checkpoint(&profile).expect("checkpoint");
        if profile.current_age == 24 {
            snapshot_at_24 = Some(profile.clone());
        }
    }
    assert_eq!(profile.current_age, 27);

    let restored = checkpoints.rollback(&profile.id, 24).expect("rollback");
    let expected = snapshot_at_24.expect("captured");
    assert_eq!(restored, expected);
    assert_eq!(restored.health_status.energy_level, 98);
    assert_eq!(restored.life_history.len(), 2);

    let live = store.require_profile(&profile.id).expect("load");
    assert_eq!(live.current_age, 24);

    let err = checkpoints.rollback(&profile.id, 40).expect_err("no snapshot");
    assert!(matches!(err, CoreError::CheckpointNotFound { .. }));
}

#[test]
fn deleting_profile_never_cascades_to_checkpoints() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("open"));
    let checkpoints = CheckpointStore::new(store.clone(), CheckpointConfig::default());
    let profile = active_profile();

    store.save_profile(&profile).expect("save");
    checkpoints.create_checkpoint(&profile).expect("checkpoint");
    assert!(store.delete_profile(&profile.id).expect("delete"));

    assert!(store.load_profile(&profile.id).expect("load").is_none());
    assert_eq!(store.checkpoints_for(&profile.id).expect("scan").len(), 1);

    // Rollback resurrects the profile from its snapshot.
    let restored = checkpoints.rollback(&profile.id, 22).expect("rollback");
    assert_eq!(restored.npcs.len(), 2);
    assert!(store.load_profile(&profile.id).expect("load").is_some());
}

// ---------------------------------------------------------------------------
// Legacy through storage
// ---------------------------------------------------------------------------

#[test]
fn heir_round_trips_through_sqlite() {
    let store = SqliteStore::open_in_memory().expect("open");
    let mut parent = active_profile();
    parent.current_age = 70;
    parent.economic_status.savings = 10_001.0;

    let child = spawn_heir(&parent);
    parent.phase = ProfilePhase::Concluded;
    store.save_profile(&parent).expect("save parent");
    store.save_profile(&child).expect("save child");

    let loaded = store.require_profile(&child.id).expect("load child");
    assert_eq!(loaded.economic_status.savings, 8_001.0);
    assert_eq!(loaded.generation, 2);
    assert_eq!(loaded.parent_profile_id.as_ref(), Some(&parent.id));
    assert_eq!(loaded.npcs.len(), 1);
    assert_eq!(loaded.health_status.energy_level, 100);

    let parent = store.require_profile(&parent.id).expect("load parent");
    assert_eq!(parent.phase, ProfilePhase::Concluded);
    assert_eq!(store.list_profiles().expect("list").len(), 2);
}

// ---------------------------------------------------------------------------
// Config file
// ---------------------------------------------------------------------------

#[test]
fn config_loads_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lifesim.toml");
    std::fs::write(
        &path,
        "[oracle]\nmax_attempts = 5\n\n[memory]\nsoft_limit_chars = 300\n",
    )
    .expect("write");

    let config = LifeSimConfig::from_file(&path).expect("load");
    let by_str = LifeSimConfig::from_file(path.to_str().expect("utf-8 path")).expect("load by str");
    assert_eq!(by_str.oracle.max_attempts, 5);
    assert_eq!(config.oracle.max_attempts, 5);
    assert_eq!(config.memory.soft_limit_chars, 300);
    assert_eq!(config.simulation.npc_situation_max_chars, 20);
}
