//! Fixtures shared by the benchmarks.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]

use lifesim_core::npc::default_parents;
use lifesim_core::scenario::Scenario;
use lifesim_core::types::{BasicInfo, EventTag, LifeHistoryEntry, Profile, ProfilePhase};
use lifesim_core::DestinyClass;

/// An active profile that has lived `years` narrated years.
#[must_use]
pub fn lived_profile(years: u32) -> Profile {
    let mut profile = Profile::draft(BasicInfo {
        name: "林晓".into(),
        start_age: 22,
        location: Some("成都".into()),
        life_experiences: Some("小镇做题家，毕业后留在省会。".into()),
        ..BasicInfo::default()
    });
    profile.phase = ProfilePhase::Active;
    profile.npcs = default_parents(profile.current_age);
    profile.long_term_memory = "毕业后独自来到大城市打拼，".repeat(20);

    for _ in 0..years {
        profile.current_age += 1;
        let scenario = Scenario {
            event: format!("{} 岁这一年，你换了第三份工作。", profile.current_age),
            status_change: "有些疲惫".into(),
            relationship_change: "和父母通话变少".into(),
            ..Scenario::default()
        };
        profile.life_history.push(LifeHistoryEntry {
            age: profile.current_age,
            event_description: scenario.to_json_string(),
            event_type: EventTag::Destiny(DestinyClass::Ordinary),
            impact_analysis: None,
        });
        profile.current_scenario = scenario;
        profile.health_status.drain_energy();
    }
    profile
}
