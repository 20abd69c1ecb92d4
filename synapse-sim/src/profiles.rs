//! Brain profiles for the village population.

use synapse_core::config::BrainConfig;
use synapse_core::{ActivityCleanupRule, ActivityRequirement, BrainProfile, Schedule};

use crate::activities::{CORE, FIGHT, IDLE, PANIC, REST, WORK};
use crate::sensors::{HurtBySensor, NearestEntitiesSensor};
use crate::slots::{ATTACK_COOLING_DOWN, ATTACK_TARGET, HOME, WALK_TARGET};
use crate::tasks::{
    FleeFromAttacker, GoHome, MeleeAttack, MoveToWalkTarget, ReactToThreat, StartAttacking, StopAttackingWhenInvalid,
    Wander,
};
use crate::world::{SimActor, SimWorld};

/// Profile type used throughout the simulation.
pub type SimProfile = BrainProfile<SimWorld, SimActor>;

const SIGHT_RANGE: f32 = 10.0;
const ARRIVE_DISTANCE: f32 = 0.5;
const HURT_MEMORY_TICKS: u64 = 100;

/// Villagers work by day, rest at night and flee from danger.
#[must_use]
pub fn villager_profile(config: &BrainConfig, seed: u64) -> SimProfile {
    let schedule = Schedule::builder()
        .change_activity_at(10, *IDLE)
        .change_activity_at(2_000, *WORK)
        .change_activity_at(9_000, *IDLE)
        .change_activity_at(12_000, *REST)
        .build();

    BrainProfile::new(*IDLE)
        .with_config(config)
        .memory(&WALK_TARGET)
        .persistent_memory(&HOME)
        .sensor_with_scan_rate(NearestEntitiesSensor::new(SIGHT_RANGE), 2)
        .sensor(HurtBySensor::new(HURT_MEMORY_TICKS))
        .core_activities([*CORE])
        .add_activity(
            *CORE,
            vec![
                (0, ReactToThreat::behavior().boxed()),
                (1, MoveToWalkTarget::behavior(ARRIVE_DISTANCE).boxed()),
            ],
        )
        .add_activity(*IDLE, vec![(10, Wander::behavior(8.0, 0.02, seed).boxed())])
        .add_activity(*WORK, vec![(10, Wander::behavior(3.0, 0.1, seed ^ 0x5eed).boxed())])
        .add_activity(*REST, vec![(10, GoHome::behavior(ARRIVE_DISTANCE).boxed())])
        .add_activity_and_remove_memories_when_stopped(
            *PANIC,
            vec![(5, FleeFromAttacker::behavior(1.5).boxed())],
            ActivityRequirement::new(),
            ActivityCleanupRule::new().erase(&WALK_TARGET),
        )
        .schedule(schedule)
}

/// Guards and raiders patrol, engage hostiles on sight and fight to the end.
#[must_use]
pub fn guard_profile(config: &BrainConfig, seed: u64) -> SimProfile {
    let schedule = Schedule::builder()
        .change_activity_at(0, *IDLE)
        .change_activity_at(13_000, *REST)
        .change_activity_at(23_000, *IDLE)
        .build();

    BrainProfile::new(*IDLE)
        .with_config(config)
        .memory(&WALK_TARGET)
        .memory(&ATTACK_COOLING_DOWN)
        .persistent_memory(&ATTACK_TARGET)
        .persistent_memory(&HOME)
        .sensor(NearestEntitiesSensor::new(SIGHT_RANGE))
        .sensor(HurtBySensor::new(HURT_MEMORY_TICKS))
        .core_activities([*CORE])
        .add_activity(
            *CORE,
            vec![
                (0, StartAttacking::behavior().boxed()),
                (1, MoveToWalkTarget::behavior(ARRIVE_DISTANCE).boxed()),
            ],
        )
        .add_activity(*IDLE, vec![(10, Wander::behavior(12.0, 0.05, seed).boxed())])
        .add_activity(*REST, vec![(10, GoHome::behavior(ARRIVE_DISTANCE).boxed())])
        .add_activity_and_remove_memories_when_stopped(
            *FIGHT,
            vec![
                (0, StopAttackingWhenInvalid::behavior(SIGHT_RANGE * 1.5).boxed()),
                (1, MeleeAttack::behavior(1.5, 10).boxed()),
            ],
            ActivityRequirement::new().value_present(&ATTACK_TARGET),
            ActivityCleanupRule::new().erase(&ATTACK_TARGET).erase(&WALK_TARGET),
        )
        .schedule(schedule)
}
