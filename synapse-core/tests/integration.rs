//! Integration Tests: End-to-End Brain Ticks
//!
//! These tests drive whole brains through a small test world: perception →
//! memory → activity selection → task lifecycle, plus snapshot round trips.

use std::sync::LazyLock;
use std::sync::atomic::Ordering;

use synapse_core::config::{BrainConfig, PersistenceConfig};
use synapse_core::memory::{MemoryModuleType, MemoryStatus, MemoryStore};
use synapse_core::metrics;
use synapse_core::task::{Behavior, BehaviorLogic, TaskContext, TaskStatus};
use synapse_core::types::{EntityId, GameClock, Location};
use synapse_core::{Activity, ActivityCleanupRule, ActivityRequirement, Brain, BrainError, BrainProfile, Schedule, Sensor, SnapshotStore};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct World {
    time: u64,
    target_in_range: bool,
    refresh_scratch: bool,
}

impl GameClock for World {
    fn game_time(&self) -> u64 {
        self.time
    }
}

#[derive(Default)]
struct Actor {
    strikes: u32,
    loiters: u32,
}

static HAS_TARGET: LazyLock<MemoryModuleType<bool>> = LazyLock::new(|| MemoryModuleType::new("has_target"));
static SCRATCH: LazyLock<MemoryModuleType<u32>> = LazyLock::new(|| MemoryModuleType::new("scratch"));
static HOME: LazyLock<MemoryModuleType<Location>> = LazyLock::new(|| MemoryModuleType::new("home"));

static CORE: LazyLock<Activity> = LazyLock::new(|| Activity::new("core"));
static IDLE: LazyLock<Activity> = LazyLock::new(|| Activity::new("idle"));
static WORK: LazyLock<Activity> = LazyLock::new(|| Activity::new("work"));
static FIGHT: LazyLock<Activity> = LazyLock::new(|| Activity::new("fight"));

struct TargetSensor;

impl Sensor<World, Actor> for TargetSensor {
    fn name(&self) -> &'static str {
        "target"
    }

    fn requires(&self) -> Vec<synapse_core::MemoryKey> {
        vec![HAS_TARGET.key()]
    }

    fn tick(&mut self, world: &World, _actor: &Actor, memory: &mut MemoryStore, _now: u64) {
        if world.target_in_range {
            memory.set(&HAS_TARGET, true);
        } else {
            memory.erase(&HAS_TARGET);
        }
    }
}

struct ScratchSensor;

impl Sensor<World, Actor> for ScratchSensor {
    fn name(&self) -> &'static str {
        "scratch"
    }

    fn requires(&self) -> Vec<synapse_core::MemoryKey> {
        vec![SCRATCH.key()]
    }

    fn tick(&mut self, world: &World, _actor: &Actor, memory: &mut MemoryStore, _now: u64) {
        if world.refresh_scratch {
            memory.set_with_expiry(&SCRATCH, 1, 1);
        }
    }
}

/// Hits the target while one is known.
struct Strike;

impl BehaviorLogic<World, Actor> for Strike {
    fn name(&self) -> &'static str {
        "strike"
    }

    fn can_continue(&mut self, ctx: &TaskContext<'_, World, Actor>) -> bool {
        ctx.memory.has_value(&HAS_TARGET)
    }

    fn tick(&mut self, ctx: &mut TaskContext<'_, World, Actor>) {
        ctx.actor.strikes += 1;
    }
}

/// Runs forever.
struct Loiter(&'static str);

impl BehaviorLogic<World, Actor> for Loiter {
    fn name(&self) -> &'static str {
        self.0
    }

    fn can_continue(&mut self, _ctx: &TaskContext<'_, World, Actor>) -> bool {
        true
    }

    fn tick(&mut self, ctx: &mut TaskContext<'_, World, Actor>) {
        ctx.actor.loiters += 1;
    }
}

/// One-shot: switches to FIGHT when a target is known.
struct Alarm;

impl BehaviorLogic<World, Actor> for Alarm {
    fn name(&self) -> &'static str {
        "alarm"
    }

    fn start(&mut self, ctx: &mut TaskContext<'_, World, Actor>) {
        ctx.set_active_activity_if_possible(*FIGHT);
    }
}

fn fighter_profile() -> BrainProfile<World, Actor> {
    BrainProfile::new(*IDLE)
        .memory(&HAS_TARGET)
        .sensor(TargetSensor)
        .add_activity(*IDLE, Vec::new())
        .add_activity_with_conditions(
            *FIGHT,
            vec![(0, Behavior::new(Strike).requires_value(&HAS_TARGET).boxed())],
            ActivityRequirement::new().value_present(&HAS_TARGET),
        )
}

fn fighter() -> Brain<World, Actor> {
    fighter_profile().build().expect("valid profile")
}

fn step(brain: &mut Brain<World, Actor>, world: &mut World, actor: &mut Actor) {
    brain.tick(world, actor);
    world.time += 1;
}

// ---------------------------------------------------------------------------
// Scheduling scenarios
// ---------------------------------------------------------------------------

#[test]
fn fight_starts_and_ticks_in_the_same_call() {
    let mut brain = fighter();
    let mut world = World::default();
    let mut actor = Actor::default();

    step(&mut brain, &mut world, &mut actor);
    assert_eq!(brain.task_statuses()[0].status, TaskStatus::Stopped);
    assert_eq!(brain.active_activities(), &[*IDLE]);

    world.target_in_range = true;
    step(&mut brain, &mut world, &mut actor);
    assert!(brain.has_memory_value(&HAS_TARGET));

    brain.set_active_activity_if_possible(*FIGHT);
    assert!(brain.is_active(*FIGHT));
    step(&mut brain, &mut world, &mut actor);

    let running = brain.running_tasks();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].name, "strike");
    assert_eq!(actor.strikes, 1);
}

#[test]
fn same_priority_and_neighbouring_tasks_all_run() {
    let mut brain = BrainProfile::<World, Actor>::new(*IDLE)
        .add_activity(
            *IDLE,
            vec![
                (0, Behavior::new(Loiter("first")).boxed()),
                (1, Behavior::new(Loiter("second")).boxed()),
                (1, Behavior::new(Loiter("third")).boxed()),
            ],
        )
        .build()
        .expect("valid profile");
    let mut world = World::default();
    let mut actor = Actor::default();

    step(&mut brain, &mut world, &mut actor);
    let names: Vec<_> = brain.running_tasks().iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
    assert_eq!(actor.loiters, 3);
}

#[test]
fn expiring_memory_survives_only_when_refreshed() {
    let mut brain = BrainProfile::<World, Actor>::new(*IDLE)
        .sensor(ScratchSensor)
        .build()
        .expect("valid profile");
    let mut world = World::default();
    let mut actor = Actor::default();

    brain.set_memory_with_expiry(&SCRATCH, 5, 1);
    step(&mut brain, &mut world, &mut actor);
    assert!(!brain.has_memory_value(&SCRATCH));

    world.refresh_scratch = true;
    brain.set_memory_with_expiry(&SCRATCH, 5, 1);
    step(&mut brain, &mut world, &mut actor);
    assert!(brain.is_memory_value(&SCRATCH, &1));
}

#[test]
fn deactivation_does_not_stop_running_tasks() {
    let mut brain = fighter();
    let mut world = World {
        target_in_range: true,
        ..World::default()
    };
    let mut actor = Actor::default();

    step(&mut brain, &mut world, &mut actor);
    brain.set_active_activity_if_possible(*FIGHT);
    step(&mut brain, &mut world, &mut actor);
    assert_eq!(actor.strikes, 1);

    brain.use_default_activity();
    assert!(!brain.is_active(*FIGHT));
    step(&mut brain, &mut world, &mut actor);
    assert_eq!(brain.running_tasks().len(), 1, "still running after deactivation");
    assert_eq!(actor.strikes, 2);

    brain.stop_all(&world, &mut actor);
    assert!(brain.running_tasks().is_empty());
    step(&mut brain, &mut world, &mut actor);
    assert!(brain.running_tasks().is_empty(), "inactive activity does not restart");
    assert_eq!(actor.strikes, 2);
}

#[test]
fn task_stops_itself_when_target_is_lost() {
    let mut brain = fighter();
    let mut world = World {
        target_in_range: true,
        ..World::default()
    };
    let mut actor = Actor::default();

    step(&mut brain, &mut world, &mut actor);
    brain.set_active_activity_if_possible(*FIGHT);
    step(&mut brain, &mut world, &mut actor);

    world.target_in_range = false;
    step(&mut brain, &mut world, &mut actor);
    assert!(brain.running_tasks().is_empty());
    assert_eq!(actor.strikes, 1);
}

#[test]
fn activity_switch_affects_later_groups_of_the_same_pass() {
    let mut brain = fighter_profile()
        .core_activities([*CORE])
        .task(-1, *CORE, Behavior::new(Alarm).requires_value(&HAS_TARGET))
        .build()
        .expect("valid profile");
    let mut world = World {
        target_in_range: true,
        ..World::default()
    };
    let mut actor = Actor::default();

    step(&mut brain, &mut world, &mut actor);
    assert!(brain.is_active(*FIGHT));
    assert!(brain.is_active(*CORE));
    assert_eq!(actor.strikes, 1);
}

#[test]
fn ineligible_activity_falls_back_to_default() {
    let mut brain = fighter();
    brain.set_active_activity_if_possible(*FIGHT);
    assert_eq!(brain.active_non_core_activity(), Some(*IDLE));

    let stranger = Activity::new("stranger");
    brain.set_active_activity_if_possible(stranger);
    assert!(!brain.active_activities().is_empty());
    assert!(!brain.is_active(stranger));
}

#[test]
fn cleanup_erases_memories_of_the_activity_left() {
    let mut brain = BrainProfile::<World, Actor>::new(*IDLE)
        .memory(&SCRATCH)
        .add_activity(*IDLE, Vec::new())
        .add_activity_and_remove_memories_when_stopped(
            *WORK,
            Vec::new(),
            ActivityRequirement::new(),
            ActivityCleanupRule::new().erase(&SCRATCH),
        )
        .build()
        .expect("valid profile");

    brain.set_active_activity_if_possible(*WORK);
    brain.set_memory(&SCRATCH, 12);
    brain.set_active_activity_if_possible(*WORK);
    assert!(brain.has_memory_value(&SCRATCH), "re-selecting is a no-op");

    brain.use_default_activity();
    assert!(!brain.has_memory_value(&SCRATCH));
}

#[test]
fn repeated_activity_registration_accumulates_rules() {
    let mut brain = BrainProfile::<World, Actor>::new(*IDLE)
        .memory(&SCRATCH)
        .memory(&HAS_TARGET)
        .add_activity(*IDLE, Vec::new())
        .add_activity_and_remove_memories_when_stopped(
            *WORK,
            Vec::new(),
            ActivityRequirement::new(),
            ActivityCleanupRule::new().erase(&SCRATCH),
        )
        .add_activity_with_conditions(*WORK, Vec::new(), ActivityRequirement::new().value_present(&HAS_TARGET))
        .build()
        .expect("valid profile");

    brain.set_active_activity_if_possible(*WORK);
    assert!(brain.is_active(*IDLE), "later requirement applies");

    brain.set_memory(&HAS_TARGET, true);
    brain.set_active_activity_if_possible(*WORK);
    assert!(brain.is_active(*WORK));

    brain.set_memory(&SCRATCH, 3);
    brain.use_default_activity();
    assert!(!brain.has_memory_value(&SCRATCH), "earlier cleanup still applies");
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[test]
fn schedule_drives_activity_with_throttle() {
    let schedule = Schedule::builder()
        .change_activity_at(0, *IDLE)
        .change_activity_at(2_000, *WORK)
        .change_activity_at(9_000, *IDLE)
        .build();
    let mut brain = BrainProfile::<World, Actor>::new(*IDLE)
        .add_activity(*IDLE, Vec::new())
        .add_activity(*WORK, Vec::new())
        .schedule(schedule)
        .build()
        .expect("valid profile");

    assert!(brain.update_activity_from_schedule(2_500, 100));
    assert!(brain.is_active(*WORK));

    assert!(!brain.update_activity_from_schedule(9_500, 119));
    assert!(brain.is_active(*WORK));

    assert!(brain.update_activity_from_schedule(9_500, 120));
    assert!(brain.is_active(*IDLE));
}

#[test]
fn configured_schedule_interval_is_used() {
    let config = BrainConfig::from_toml("[scheduler]\nschedule_update_interval_ticks = 5\n").expect("valid toml");
    let mut brain = BrainProfile::<World, Actor>::new(*IDLE)
        .with_config(&config)
        .build()
        .expect("valid profile");

    let evaluated = (0..20).filter(|&t| brain.update_activity_from_schedule(t, t)).count();
    assert_eq!(evaluated, 4);
}

/// Takes longer than a 1µs brain budget.
struct Dawdle;

impl BehaviorLogic<World, Actor> for Dawdle {
    fn name(&self) -> &'static str {
        "dawdle"
    }

    fn start(&mut self, _ctx: &mut TaskContext<'_, World, Actor>) {
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
}

#[test]
fn slow_brain_ticks_are_counted() {
    let config = BrainConfig::from_toml("[telemetry]\nlog_slow_ticks_us = 1\n").expect("valid toml");
    let mut brain = BrainProfile::<World, Actor>::new(*IDLE)
        .with_config(&config)
        .task(0, *IDLE, Behavior::new(Dawdle))
        .build()
        .expect("valid profile");
    let mut world = World::default();
    let mut actor = Actor::default();

    let before = metrics::counters().slow_brain_ticks.load(Ordering::Relaxed);
    step(&mut brain, &mut world, &mut actor);
    assert!(metrics::counters().slow_brain_ticks.load(Ordering::Relaxed) > before);
}

// ---------------------------------------------------------------------------
// Introspection & persistence
// ---------------------------------------------------------------------------

#[test]
fn debug_info_serializes() {
    let mut brain = fighter();
    let mut world = World {
        target_in_range: true,
        ..World::default()
    };
    let mut actor = Actor::default();
    step(&mut brain, &mut world, &mut actor);

    let info = brain.debug_info();
    assert_eq!(info.ticks, 1);
    assert_eq!(info.sensors, vec!["target"]);
    let json = serde_json::to_string(&info).expect("serializable");
    assert!(json.contains("has_target"));
    assert!(json.contains("idle"));
}

#[test]
fn unregistered_checks_are_false() {
    let brain = fighter();
    assert!(!brain.check_memory(SCRATCH.key(), MemoryStatus::Registered));
    assert!(!brain.check_memory(SCRATCH.key(), MemoryStatus::ValueAbsent));
    assert!(brain.check_memory(HAS_TARGET.key(), MemoryStatus::ValueAbsent));
}

#[test]
fn snapshot_round_trip_through_store() {
    let profile = || {
        BrainProfile::<World, Actor>::new(*IDLE)
            .memory(&SCRATCH)
            .persistent_memory(&HOME)
    };
    let mut brain = profile().build().expect("valid profile");
    brain.set_memory_with_expiry(&HOME, Location::new(4.0, 0.0, -2.0), 50);
    brain.set_memory(&SCRATCH, 3);

    let store = SnapshotStore::open_in_memory(&PersistenceConfig::default()).expect("in-memory db");
    let id = EntityId::new();
    store.save(&id, &brain.snapshot_memories()).expect("save");

    let snapshot = store.load(&id).expect("load").expect("present");
    assert_eq!(snapshot.len(), 1, "non-persistent slots are not saved");

    let mut restored = profile().build().expect("valid profile");
    assert_eq!(restored.restore_memories(&snapshot), 1);
    assert_eq!(restored.get_memory(&HOME), Some(&Location::new(4.0, 0.0, -2.0)));
    assert_eq!(restored.memory().time_until_expiry(&HOME), Some(50));
    assert!(!restored.has_memory_value(&SCRATCH));
}

#[test]
fn duplicate_persistent_names_are_rejected() {
    let other_home = MemoryModuleType::<Location>::new("home");
    let result = BrainProfile::<World, Actor>::new(*IDLE)
        .persistent_memory(&HOME)
        .persistent_memory(&other_home)
        .build();
    assert!(matches!(result, Err(BrainError::DuplicateSlotName { name }) if name == "home"));
}
