//! Legacy: concluding one life and starting the next generation.

use crate::npc::{Npc, NpcRelation, NpcStatus};
use crate::types::{BasicInfo, EconomicStatus, Profile, ProfileId, ProfilePhase};

/// Share of the parent's savings passed on to the child.
pub const INHERITANCE_RATE: f64 = 0.8;

/// Build the child profile of `parent`. Pure; the parent is not modified.
///
/// The child starts at age 0 in [`ProfilePhase::Drafting`] with a fresh id,
/// the parent's location and difficulty, 80% of the parent's savings (rounded
/// to a whole amount) and a single NPC: the retired parent.
#[must_use]
pub fn spawn_heir(parent: &Profile) -> Profile {
    let basic_info = BasicInfo {
        name: format!("{}的孩子", parent.basic_info.name),
        start_age: 0,
        location: parent.basic_info.location.clone(),
        ..BasicInfo::default()
    };

    let economic_status = EconomicStatus {
        savings: (parent.economic_status.savings * INHERITANCE_RATE).round(),
        ..EconomicStatus::default()
    };

    let elder = Npc::new(
        parent.basic_info.name.clone(),
        NpcRelation::Parent,
        parent.current_age,
        80,
    )
    .with_status(NpcStatus::Retired);

    Profile {
        id: ProfileId::generate(),
        difficulty: parent.difficulty,
        phase: ProfilePhase::Drafting,
        basic_info,
        economic_status,
        current_age: 0,
        generation: parent.generation + 1,
        parent_profile_id: Some(parent.id.clone()),
        npcs: vec![elder],
        ..Profile::default()
    }
}
