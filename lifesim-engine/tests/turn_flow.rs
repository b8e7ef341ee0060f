//! End-to-end turn flow against a scripted oracle and an in-memory store,
//! with one pass over an on-disk SQLite store.
//!
//! The scripted transport answers by role, so the number of NPCs or retries
//! never shifts the replies out of order. Time is paused: backoff sleeps
//! complete instantly.

use std::sync::Arc;

use lifesim_core::checkpoint::Checkpoint;
use lifesim_core::config::{LifeSimConfig, PersistenceConfig};
use lifesim_core::destiny::DestinyRoller;
use lifesim_core::npc::NpcStatus;
use lifesim_core::persistence::{CheckpointRepository, InMemoryStore, ProfileRepository, SqliteStore, Store};
use lifesim_core::scenario::RepairKind;
use lifesim_core::types::{BasicInfo, EventTag, Profile, ProfileId, ProfilePhase};
use lifesim_core::CoreError;
use lifesim_engine::choices::DEFAULT_CHOICES;
use lifesim_engine::world::NEUTRAL_MACRO_EVENT;
use lifesim_engine::{EngineError, MemoryOutcome, SimulationOrchestrator, TurnEvent};
use lifesim_llm::{ChatRequest, OracleClient, OracleRole, ScriptedTransport, Transport, TransportReply};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

const OPENING: &str = r#"{"event":"你拖着行李箱走出火车站。","status_change":"有些疲惫","relationship_change":"父母在电话里叮嘱"}"#;
const YEARLY: &str = r#"{"event":"你在新公司站稳了脚跟。","status_change":"精神不错","relationship_change":"和同事熟络起来","mood":"hopeful"}"#;
const SKIP: &str = r#"{"event":"几年过去，日子平淡如水。","status_change":"眼角多了细纹","relationship_change":"老友各奔东西"}"#;

fn role_of(request: &ChatRequest) -> Option<OracleRole> {
    let system = request.messages.first()?.content.as_str();
    [
        OracleRole::Narrator,
        OracleRole::Psychologist,
        OracleRole::Historian,
        OracleRole::Judge,
        OracleRole::NpcEngine,
        OracleRole::Biographer,
        OracleRole::GameDesigner,
    ]
    .into_iter()
    .find(|role| role.system_prompt() == system)
}

fn is_skip_prompt(request: &ChatRequest) -> bool {
    request.last_user_content().is_some_and(|p| p.contains("快速蒙太奇"))
}

fn is_opening_prompt(request: &ChatRequest) -> bool {
    request.last_user_content().is_some_and(|p| !p.contains("年份："))
}

/// A well-behaved oracle.
fn happy(request: &ChatRequest) -> TransportReply {
    let content = match role_of(request) {
        Some(OracleRole::Historian) => "全球经济缓慢复苏。".to_string(),
        Some(OracleRole::Judge) => "成功。你的坚持得到了回报。".to_string(),
        Some(OracleRole::NpcEngine) => "在公园里下棋".to_string(),
        Some(OracleRole::Narrator) if is_skip_prompt(request) => SKIP.to_string(),
        Some(OracleRole::Narrator) if is_opening_prompt(request) => OPENING.to_string(),
        Some(OracleRole::Narrator) => YEARLY.to_string(),
        Some(OracleRole::Biographer) => "毕业后独自来到大城市打拼。".to_string(),
        Some(OracleRole::GameDesigner) => r#"["辞职创业","稳扎稳打","回家陪父母"]"#.to_string(),
        Some(OracleRole::Psychologist) => r#"{"probes":["问题一","问题二","问题三"],
             "personalityTraits":{"Openness":70,"Ambition":140},"coreValues":["自由"]}"#
            .to_string(),
        None => "?".to_string(),
    };
    TransportReply::completion(&content)
}

struct Harness {
    script: Arc<ScriptedTransport>,
    store: Arc<InMemoryStore>,
    engine: SimulationOrchestrator,
}

fn engine_over(
    config: &LifeSimConfig,
    store: Arc<dyn Store>,
    seed: u64,
) -> (Arc<ScriptedTransport>, SimulationOrchestrator) {
    let script = Arc::new(ScriptedTransport::new());
    script.set_responder(happy);
    let transport: Arc<dyn Transport> = script.clone();
    let oracle = Arc::new(OracleClient::new(transport, &config.oracle));
    let engine = SimulationOrchestrator::new(config, oracle, store).with_roller(DestinyRoller::seeded(seed));
    (script, engine)
}

fn harness_with(config: &LifeSimConfig, seed: u64) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let (script, engine) = engine_over(config, store.clone(), seed);
    Harness { script, store, engine }
}

fn harness() -> Harness {
    harness_with(&LifeSimConfig::default(), 7)
}

fn draft() -> Profile {
    let mut profile = Profile::draft(BasicInfo {
        name: "林晓".into(),
        start_age: 22,
        location: Some("成都".into()),
        ..BasicInfo::default()
    });
    profile.economic_status.savings = 10_000.0;
    profile
}

async fn activate(engine: &SimulationOrchestrator) -> ProfileId {
    let created = engine.create_profile(draft()).await.expect("create");
    engine.generate_probes(&created.id).await.expect("probes");
    engine
        .start(&created.id, &[("问题一".into(), "选自由".into())])
        .await
        .expect("start");
    created.id
}

async fn active_profile(h: &Harness) -> ProfileId {
    activate(&h.engine).await
}

/// In-memory store whose disk is full for every heir.
#[derive(Debug, Default)]
struct HeirRejectingStore(InMemoryStore);

impl ProfileRepository for HeirRejectingStore {
    fn load_profile(&self, id: &ProfileId) -> lifesim_core::error::Result<Option<Profile>> {
        self.0.load_profile(id)
    }

    fn save_profile(&self, profile: &Profile) -> lifesim_core::error::Result<()> {
        if profile.generation > 1 {
            return Err(CoreError::Io(std::io::Error::other("disk full")));
        }
        self.0.save_profile(profile)
    }

    fn delete_profile(&self, id: &ProfileId) -> lifesim_core::error::Result<bool> {
        self.0.delete_profile(id)
    }

    fn list_profiles(&self) -> lifesim_core::error::Result<Vec<ProfileId>> {
        self.0.list_profiles()
    }
}

impl CheckpointRepository for HeirRejectingStore {
    fn insert_checkpoint(&self, checkpoint: &Checkpoint) -> lifesim_core::error::Result<u64> {
        self.0.insert_checkpoint(checkpoint)
    }

    fn checkpoints_for(&self, profile: &ProfileId) -> lifesim_core::error::Result<Vec<Checkpoint>> {
        self.0.checkpoints_for(profile)
    }

    fn delete_checkpoint(&self, seq: u64) -> lifesim_core::error::Result<bool> {
        self.0.delete_checkpoint(seq)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn start_activates_profile_with_parents_and_menu() {
    let h = harness();
    let created = h.engine.create_profile(draft()).await.expect("create");
    assert_eq!(created.phase, ProfilePhase::Drafting);
    assert!(!created.id.as_str().is_empty());

    let probes = h.engine.generate_probes(&created.id).await.expect("probes");
    assert_eq!(probes, vec!["问题一", "问题二", "问题三"]);
    assert_eq!(h.engine.profile(&created.id).expect("load").phase, ProfilePhase::AnsweringProbes);

    let profile = h
        .engine
        .start(&created.id, &[("问题一".into(), "选自由".into())])
        .await
        .expect("start");

    assert_eq!(profile.phase, ProfilePhase::Active);
    assert_eq!(profile.current_age, 22);
    assert_eq!(profile.personality_traits["Openness"], 70);
    assert_eq!(profile.personality_traits["Ambition"], 100);
    assert_eq!(profile.core_values, vec!["自由"]);
    assert_eq!(profile.npcs.len(), 2);
    assert_eq!(profile.current_scenario.event, "你拖着行李箱走出火车站。");
    assert_eq!(profile.available_choices, vec!["辞职创业", "稳扎稳打", "回家陪父母"]);
    assert!(profile.life_history.is_empty());

    let history = h.engine.checkpoint_history(&profile.id).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].age, 22);
}

#[tokio::test(start_paused = true)]
async fn creating_over_an_existing_id_is_rejected() {
    let h = harness();
    let id = active_profile(&h).await;
    let before = h.engine.profile(&id).expect("load");
    let mut clash = draft();
    clash.id = id.clone();
    clash.basic_info.name = "冒名者".into();

    let err = h.engine.create_profile(clash).await.expect_err("duplicate id");

    assert!(matches!(err, EngineError::InvalidInput(_)));
    let after = h.engine.profile(&id).expect("load");
    assert_eq!(after, before);
    assert_eq!(after.phase, ProfilePhase::Active);
}

#[tokio::test(start_paused = true)]
async fn unparseable_analysis_falls_back_to_default_traits() {
    let h = harness();
    h.script.set_responder(|request| match role_of(request) {
        Some(OracleRole::Psychologist) => TransportReply::completion("我觉得你是个好人"),
        _ => happy(request),
    });
    let created = h.engine.create_profile(draft()).await.expect("create");

    let profile = h.engine.start(&created.id, &[]).await.expect("start");

    assert_eq!(profile.phase, ProfilePhase::Active);
    assert_eq!(profile.personality_traits["Openness"], 50);
    assert_eq!(profile.personality_traits["Resilience"], 50);
}

// ---------------------------------------------------------------------------
// Yearly turns
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn simulate_year_runs_every_step_once() {
    let h = harness();
    let id = active_profile(&h).await;
    let before = h.script.request_count();

    let outcome = h.engine.simulate_year(&id, "辞职创业").await.expect("turn");
    let profile = &outcome.profile;

    assert_eq!(profile.current_age, 23);
    assert_eq!(profile.health_status.energy_level, 99);
    assert_eq!(profile.life_history.len(), 1);
    let entry = profile.life_history.last().expect("entry");
    assert_eq!(entry.age, 23);
    assert_eq!(entry.event_type, EventTag::Destiny(outcome.destiny().expect("rolled")));
    assert!(entry.event_description.contains("你在新公司站稳了脚跟。"));

    assert_eq!(profile.current_scenario.status_change, "精神不错");
    assert_eq!(profile.current_scenario.extra["mood"], "hopeful");
    assert_eq!(profile.available_choices.len(), 3);
    assert_eq!(profile.long_term_memory, "毕业后独自来到大城市打拼。");
    assert_eq!(profile.npcs[0].age, 48);
    assert_eq!(profile.npcs[0].current_situation, "在公园里下棋");

    // historian, judge, two NPCs, narrator, game designer, biographer
    assert_eq!(h.script.request_count() - before, 7);

    assert!(matches!(
        &outcome.log[0],
        TurnEvent::MacroEvent { year: 2024, text } if text == "全球经济缓慢复苏。"
    ));
    assert!(matches!(outcome.log[1], TurnEvent::Destiny { .. }));
    assert!(matches!(&outcome.log[2], TurnEvent::Outcome { choice, .. } if choice == "辞职创业"));
    assert_eq!(outcome.repair(), Some(RepairKind::Strict));
    assert!(matches!(
        outcome.log.last(),
        Some(TurnEvent::Memory { outcome: MemoryOutcome::Updated })
    ));

    assert_eq!(h.engine.profile(&id).expect("load"), outcome.profile);
}

#[tokio::test(start_paused = true)]
async fn calendar_year_follows_age() {
    let h = harness();
    let id = active_profile(&h).await;

    h.engine.simulate_year(&id, "稳扎稳打").await.expect("first");
    let second = h.engine.simulate_year(&id, "稳扎稳打").await.expect("second");

    assert!(matches!(second.log[0], TurnEvent::MacroEvent { year: 2025, .. }));
}

#[tokio::test(start_paused = true)]
async fn empty_choice_uses_configured_default() {
    let h = harness();
    let id = active_profile(&h).await;

    let outcome = h.engine.simulate_year(&id, "  ").await.expect("turn");

    assert!(matches!(&outcome.log[2], TurnEvent::Outcome { choice, .. } if choice == "平稳度过"));
}

#[tokio::test(start_paused = true)]
async fn missing_narrative_fields_get_yearly_defaults() {
    let h = harness();
    let id = active_profile(&h).await;
    h.script.set_responder(|request| match role_of(request) {
        Some(OracleRole::Narrator) => {
            TransportReply::completion(r#"{"event": "你遇见了一个人", "status_change": "心跳加速"}"#)
        }
        _ => happy(request),
    });

    let outcome = h.engine.simulate_year(&id, "稳扎稳打").await.expect("turn");
    let scenario = &outcome.profile.current_scenario;

    assert_eq!(scenario.event, "你遇见了一个人");
    assert_eq!(scenario.status_change, "心跳加速");
    assert_eq!(scenario.relationship_change, "一切如常");
}

#[tokio::test(start_paused = true)]
async fn prose_narrative_is_synthesized_after_retries() {
    let h = harness();
    let id = active_profile(&h).await;
    h.script.set_responder(|request| match role_of(request) {
        Some(OracleRole::Narrator) => TransportReply::completion("这一年，你什么也没做成。"),
        _ => happy(request),
    });

    let outcome = h.engine.simulate_year(&id, "稳扎稳打").await.expect("turn");
    let scenario = &outcome.profile.current_scenario;

    assert_eq!(outcome.repair(), Some(RepairKind::Synthesized));
    assert!(scenario.event.starts_with("Failed after 3 attempts"));
    assert_eq!(scenario.status_change, "无明显变化");
    assert_eq!(scenario.relationship_change, "一切如常");
    assert_eq!(outcome.profile.current_age, 23);
}

#[tokio::test(start_paused = true)]
async fn total_oracle_outage_still_completes_the_turn() {
    let h = harness();
    let id = active_profile(&h).await;
    let before = h.engine.profile(&id).expect("load");
    h.script
        .set_fallback(TransportReply::status(503, "Service Unavailable"));

    let outcome = h.engine.simulate_year(&id, "稳扎稳打").await.expect("turn");
    let profile = &outcome.profile;

    assert!(matches!(
        &outcome.log[0],
        TurnEvent::MacroEvent { text, .. } if text == NEUTRAL_MACRO_EVENT
    ));
    assert_eq!(profile.current_age, before.current_age + 1);
    assert_eq!(profile.available_choices, DEFAULT_CHOICES);
    assert_eq!(profile.long_term_memory, before.long_term_memory);
    assert!(matches!(
        outcome.log.last(),
        Some(TurnEvent::Memory { outcome: MemoryOutcome::Retained })
    ));
    for (after, prior) in profile.npcs.iter().zip(&before.npcs) {
        assert_eq!(after.current_situation, prior.current_situation);
        assert_eq!(after.status, prior.status);
        assert_eq!(after.age, prior.age + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn rejected_memory_call_keeps_previous_memory() {
    let h = harness();
    let id = active_profile(&h).await;
    let first = h.engine.simulate_year(&id, "稳扎稳打").await.expect("first");
    h.script.set_responder(|request| match role_of(request) {
        Some(OracleRole::Biographer) => TransportReply::status(401, "Unauthorized"),
        _ => happy(request),
    });

    let second = h.engine.simulate_year(&id, "稳扎稳打").await.expect("second");

    assert_eq!(second.profile.long_term_memory, first.profile.long_term_memory);
    assert_eq!(second.profile.current_age, 24);
}

#[tokio::test(start_paused = true)]
async fn npc_death_is_terminal() {
    let h = harness();
    let id = active_profile(&h).await;
    h.script.set_responder(|request| match role_of(request) {
        Some(OracleRole::NpcEngine) => TransportReply::completion("突发心梗去世"),
        _ => happy(request),
    });
    let first = h.engine.simulate_year(&id, "稳扎稳打").await.expect("first");
    assert!(first.profile.npcs.iter().all(|n| n.status == NpcStatus::Dead));

    h.script.set_responder(|request| match role_of(request) {
        Some(OracleRole::NpcEngine) => TransportReply::completion("身体康复，精神矍铄"),
        _ => happy(request),
    });
    let seen = h.script.request_count();
    let second = h.engine.simulate_year(&id, "稳扎稳打").await.expect("second");

    assert!(second.profile.npcs.iter().all(|n| n.status == NpcStatus::Dead));
    assert_eq!(second.profile.npcs[0].age, first.profile.npcs[0].age + 1);
    let npc_calls = h.script.requests()[seen..]
        .iter()
        .filter(|r| role_of(r) == Some(OracleRole::NpcEngine))
        .count();
    assert_eq!(npc_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn advance_year_does_not_touch_storage() {
    let h = harness();
    let id = active_profile(&h).await;
    let stored = h.engine.profile(&id).expect("load");

    let outcome = h.engine.advance_year(stored.clone(), "稳扎稳打").await.expect("turn");

    assert_eq!(outcome.profile.current_age, stored.current_age + 1);
    assert_eq!(h.engine.profile(&id).expect("reload"), stored);
    assert_eq!(h.engine.checkpoint_history(&id).expect("history").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn same_seed_gives_same_destiny_sequence() {
    let config = LifeSimConfig::default();
    let mut runs = Vec::new();
    for _ in 0..2 {
        let h = harness_with(&config, 2024);
        let id = active_profile(&h).await;
        let mut classes = Vec::new();
        for _ in 0..5 {
            let outcome = h.engine.simulate_year(&id, "稳扎稳打").await.expect("turn");
            classes.push(outcome.destiny().expect("rolled"));
        }
        runs.push(classes);
    }
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_turns_on_one_profile_are_serialised() {
    let h = harness();
    let id = active_profile(&h).await;

    let (a, b) = tokio::join!(
        h.engine.simulate_year(&id, "辞职创业"),
        h.engine.simulate_year(&id, "回家陪父母"),
    );
    a.expect("a");
    b.expect("b");

    let profile = h.engine.profile(&id).expect("load");
    assert_eq!(profile.current_age, 24);
    assert_eq!(profile.life_history.len(), 2);
    assert_eq!(profile.health_status.energy_level, 98);
}

// ---------------------------------------------------------------------------
// Skips
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn skip_years_issues_one_montage() {
    let h = harness();
    let id = active_profile(&h).await;
    let before = h.script.request_count();

    let outcome = h.engine.skip_years(&id, 5).await.expect("skip");
    let profile = &outcome.profile;

    assert_eq!(profile.current_age, 27);
    assert_eq!(profile.health_status.energy_level, 95);
    assert_eq!(profile.npcs[0].age, 52);
    assert_eq!(profile.life_history.len(), 1);
    let entry = profile.life_history.last().expect("entry");
    assert_eq!(entry.event_type, EventTag::Skip);
    assert_eq!(entry.age, 27);
    assert_eq!(profile.current_scenario.event, "几年过去，日子平淡如水。");

    // narrator, game designer, biographer
    assert_eq!(h.script.request_count() - before, 3);
    assert_eq!(h.engine.profile(&id).expect("load"), outcome.profile);
}

#[tokio::test(start_paused = true)]
async fn skip_zero_years_is_a_no_op() {
    let h = harness();
    let id = active_profile(&h).await;
    let before = h.engine.profile(&id).expect("load");
    let requests = h.script.request_count();

    let outcome = h.engine.skip_years(&id, 0).await.expect("skip");

    assert_eq!(outcome.profile, before);
    assert!(outcome.log.is_empty());
    assert_eq!(h.script.request_count(), requests);
    assert_eq!(h.engine.checkpoint_history(&id).expect("history").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn long_skip_is_unbounded_by_default() {
    let h = harness();
    let id = active_profile(&h).await;

    let outcome = h.engine.skip_years(&id, 60).await.expect("skip");

    assert_eq!(outcome.profile.current_age, 82);
    assert_eq!(h.engine.profile(&id).expect("load").current_age, 82);
    assert_eq!(outcome.profile.health_status.energy_level, 40);
}

#[tokio::test(start_paused = true)]
async fn skip_beyond_configured_cap_is_rejected() {
    let mut config = LifeSimConfig::default();
    config.simulation.max_skip_years = Some(50);
    let h = harness_with(&config, 7);
    let id = active_profile(&h).await;

    let err = h.engine.skip_years(&id, 51).await.expect_err("too long");
    assert!(matches!(err, EngineError::InvalidInput(_)));
    assert_eq!(h.engine.profile(&id).expect("load").current_age, 22);

    let outcome = h.engine.skip_years(&id, 50).await.expect("at cap");
    assert_eq!(outcome.profile.current_age, 72);
}

#[tokio::test(start_paused = true)]
async fn skipped_montage_falls_back_to_skip_defaults() {
    let h = harness();
    let id = active_profile(&h).await;
    h.script.set_responder(|request| match role_of(request) {
        Some(OracleRole::Narrator) => TransportReply::completion(r#"{"event":"十年一晃而过"}"#),
        _ => happy(request),
    });

    let outcome = h.engine.skip_years(&id, 10).await.expect("skip");

    assert_eq!(outcome.profile.current_scenario.status_change, "岁月留痕");
    assert_eq!(outcome.profile.current_scenario.relationship_change, "故人渐远");
}

// ---------------------------------------------------------------------------
// Legacy
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn legacy_concludes_parent_and_persists_child() {
    let h = harness();
    let id = active_profile(&h).await;
    h.engine.skip_years(&id, 30).await.expect("skip");

    let child = h.engine.create_legacy(&id).await.expect("legacy");

    assert_eq!(child.phase, ProfilePhase::Drafting);
    assert_eq!(child.current_age, 0);
    assert_eq!(child.generation, 2);
    assert_eq!(child.parent_profile_id.as_ref(), Some(&id));
    assert_eq!(child.economic_status.savings, 8_000.0);
    assert_eq!(child.basic_info.location.as_deref(), Some("成都"));
    assert_eq!(child.npcs.len(), 1);
    assert_eq!(child.npcs[0].age, 52);
    assert_eq!(child.npcs[0].status, NpcStatus::Retired);

    assert_eq!(h.engine.profile(&id).expect("parent").phase, ProfilePhase::Concluded);
    assert_eq!(h.store.load_profile(&child.id).expect("load"), Some(child));

    let err = h.engine.simulate_year(&id, "稳扎稳打").await.expect_err("concluded");
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidPhase { actual: ProfilePhase::Concluded, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn failed_heir_write_leaves_parent_active() {
    let config = LifeSimConfig::default();
    let store = Arc::new(HeirRejectingStore::default());
    let (_script, engine) = engine_over(&config, store.clone(), 7);
    let id = activate(&engine).await;

    let err = engine.create_legacy(&id).await.expect_err("heir write fails");

    assert!(matches!(err, EngineError::Core(CoreError::Io(_))));
    assert_eq!(engine.profile(&id).expect("parent").phase, ProfilePhase::Active);
    assert_eq!(store.list_profiles().expect("list"), vec![id.clone()]);
    engine.simulate_year(&id, "稳扎稳打").await.expect("still playable");
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn missing_profile_is_not_found() {
    let h = harness();
    let ghost = ProfileId::from("ghost");

    let err = h.engine.simulate_year(&ghost, "稳扎稳打").await.expect_err("missing");

    assert!(matches!(err, EngineError::Core(CoreError::ProfileNotFound(ref id)) if *id == ghost));
    assert_eq!(h.script.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn drafting_profile_cannot_play_turns() {
    let h = harness();
    let created = h.engine.create_profile(draft()).await.expect("create");

    let err = h.engine.simulate_year(&created.id, "稳扎稳打").await.expect_err("drafting");

    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidPhase { actual: ProfilePhase::Drafting, .. })
    ));
    assert_eq!(h.engine.profile(&created.id).expect("load"), created);
    assert_eq!(h.script.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn active_profile_cannot_restart() {
    let h = harness();
    let id = active_profile(&h).await;

    let err = h.engine.start(&id, &[]).await.expect_err("already active");

    assert!(matches!(err, EngineError::Core(CoreError::InvalidPhase { .. })));
}

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn rollback_restores_earlier_turn() {
    let h = harness();
    let id = active_profile(&h).await;
    let at_23 = h.engine.simulate_year(&id, "稳扎稳打").await.expect("23").profile;
    h.engine.simulate_year(&id, "辞职创业").await.expect("24");
    h.engine.simulate_year(&id, "回家陪父母").await.expect("25");

    let ages: Vec<u32> = h
        .engine
        .checkpoint_history(&id)
        .expect("history")
        .iter()
        .map(|c| c.age)
        .collect();
    assert_eq!(ages, vec![25, 24, 23, 22]);

    let restored = h.engine.rollback(&id, 23).await.expect("rollback");
    assert_eq!(restored, at_23);
    assert_eq!(h.engine.profile(&id).expect("load"), at_23);

    let err = h.engine.rollback(&id, 40).await.expect_err("no snapshot");
    assert!(matches!(
        err,
        EngineError::Core(CoreError::CheckpointNotFound { age: 40, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn deleted_profile_can_be_resurrected_by_rollback() {
    let h = harness();
    let id = active_profile(&h).await;
    h.engine.simulate_year(&id, "稳扎稳打").await.expect("turn");

    assert!(h.engine.delete_profile(&id).await.expect("delete"));
    assert!(h.engine.profile(&id).is_err());

    let restored = h.engine.rollback(&id, 23).await.expect("rollback");
    assert_eq!(restored.current_age, 23);
    assert_eq!(restored.npcs.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn manual_checkpoint_without_auto() {
    let mut config = LifeSimConfig::default();
    config.simulation.auto_checkpoint = false;
    let h = harness_with(&config, 1);
    let id = active_profile(&h).await;
    h.engine.simulate_year(&id, "稳扎稳打").await.expect("turn");
    assert!(h.engine.checkpoint_history(&id).expect("history").is_empty());

    h.engine.create_checkpoint(&id).await.expect("checkpoint");

    let history = h.engine.checkpoint_history(&id).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].age, 23);
}

// ---------------------------------------------------------------------------
// On-disk store
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn sqlite_store_survives_reopen_and_rollback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lifesim.db");
    let config = LifeSimConfig::default();

    let id = {
        let store = Arc::new(SqliteStore::open(&path, &PersistenceConfig::default()).expect("open"));
        let (_script, engine) = engine_over(&config, store, 7);
        let id = activate(&engine).await;
        engine.simulate_year(&id, "稳扎稳打").await.expect("23");
        engine.simulate_year(&id, "辞职创业").await.expect("24");
        id
    };

    let store = Arc::new(SqliteStore::open(&path, &PersistenceConfig::default()).expect("reopen"));
    let (_script, engine) = engine_over(&config, store, 7);
    let profile = engine.profile(&id).expect("load");
    assert_eq!(profile.current_age, 24);
    assert_eq!(profile.npcs.len(), 2);
    assert_eq!(profile.life_history.len(), 2);

    let ages: Vec<u32> = engine
        .checkpoint_history(&id)
        .expect("history")
        .iter()
        .map(|c| c.age)
        .collect();
    assert_eq!(ages, vec![24, 23, 22]);

    let restored = engine.rollback(&id, 23).await.expect("rollback");
    assert_eq!(restored.current_age, 23);
    assert_eq!(engine.profile(&id).expect("load").life_history.len(), 1);
}
