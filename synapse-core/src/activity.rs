//! Activities and the rules for switching between them.
//!
//! An [`Activity`] is a named behavior context (idle, work, fight, ...). A
//! brain always has its core activities active plus at most one non-core
//! activity. [`ActivitySelector`] owns that state together with the
//! per-activity eligibility requirements, the erase-on-exit cleanup rules and
//! the daily schedule.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use tracing::debug;

use crate::memory::{MemoryKey, MemoryModuleType, MemoryStatus, MemoryStore};
use crate::metrics;
use crate::schedule::Schedule;

static NEXT_ACTIVITY_ID: AtomicU32 = AtomicU32::new(0);

/// An interned activity label. Identity is the interned id, never the name.
#[derive(Debug, Clone, Copy)]
pub struct Activity {
    id: u32,
    name: &'static str,
}

impl Activity {
    /// Intern a new activity.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            id: NEXT_ACTIVITY_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name,
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.name
    }
}

impl PartialEq for Activity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Activity {}

impl Hash for Activity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Activity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Activity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ---------------------------------------------------------------------------
// Requirements & cleanup rules
// ---------------------------------------------------------------------------

/// Memory conditions that must all hold for an activity to be eligible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityRequirement {
    conditions: Vec<(MemoryKey, MemoryStatus)>,
}

impl ActivityRequirement {
    /// No conditions: always eligible.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw (slot, status) condition.
    #[must_use]
    pub fn with(mut self, key: MemoryKey, status: MemoryStatus) -> Self {
        self.conditions.push((key, status));
        self
    }

    /// Require `slot` to hold a value.
    #[must_use]
    pub fn value_present<T>(self, slot: &MemoryModuleType<T>) -> Self {
        self.with(slot.key(), MemoryStatus::ValuePresent)
    }

    /// Require `slot` to be empty.
    #[must_use]
    pub fn value_absent<T>(self, slot: &MemoryModuleType<T>) -> Self {
        self.with(slot.key(), MemoryStatus::ValueAbsent)
    }

    /// Whether every condition holds against `memory`.
    #[must_use]
    pub fn is_met(&self, memory: &MemoryStore) -> bool {
        self.conditions.iter().all(|&(key, status)| memory.has(key, status))
    }

    /// The slots this requirement looks at.
    pub fn slots(&self) -> impl Iterator<Item = MemoryKey> + '_ {
        self.conditions.iter().map(|(key, _)| *key)
    }

    pub(crate) fn merge(&mut self, other: Self) {
        for condition in other.conditions {
            if !self.conditions.contains(&condition) {
                self.conditions.push(condition);
            }
        }
    }
}

/// Memory slots erased when an activity stops being active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityCleanupRule {
    erase: Vec<MemoryKey>,
}

impl ActivityCleanupRule {
    /// An empty rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Erase `slot` on exit.
    #[must_use]
    pub fn erase<T>(self, slot: &MemoryModuleType<T>) -> Self {
        self.erase_key(slot.key())
    }

    /// Erase a slot by key on exit.
    #[must_use]
    pub fn erase_key(mut self, key: MemoryKey) -> Self {
        if !self.erase.contains(&key) {
            self.erase.push(key);
        }
        self
    }

    /// The slots this rule erases.
    pub fn slots(&self) -> impl Iterator<Item = MemoryKey> + '_ {
        self.erase.iter().copied()
    }

    pub(crate) fn merge(&mut self, other: Self) {
        for key in other.erase {
            if !self.erase.contains(&key) {
                self.erase.push(key);
            }
        }
    }

    fn apply(&self, memory: &mut MemoryStore) {
        for &key in &self.erase {
            memory.erase_key(key);
        }
    }
}

// ---------------------------------------------------------------------------
// ActivitySelector
// ---------------------------------------------------------------------------

/// Active-activity state and switching policy of one brain.
#[derive(Debug, Clone)]
pub struct ActivitySelector {
    requirements: HashMap<Activity, ActivityRequirement>,
    cleanup: HashMap<Activity, ActivityCleanupRule>,
    core: Vec<Activity>,
    default: Activity,
    active: Vec<Activity>,
    schedule: Schedule,
    schedule_interval: u64,
    last_schedule_update: Option<u64>,
}

impl ActivitySelector {
    pub(crate) fn new(
        requirements: HashMap<Activity, ActivityRequirement>,
        cleanup: HashMap<Activity, ActivityCleanupRule>,
        core: Vec<Activity>,
        default: Activity,
        schedule: Schedule,
        schedule_interval: u64,
    ) -> Self {
        let mut active = core.clone();
        if !active.contains(&default) {
            active.push(default);
        }
        Self {
            requirements,
            cleanup,
            core,
            default,
            active,
            schedule,
            schedule_interval,
            last_schedule_update: None,
        }
    }

    /// Whether `activity` is currently active (core or selected).
    #[must_use]
    pub fn is_active(&self, activity: Activity) -> bool {
        self.active.contains(&activity)
    }

    /// Currently active activities: the core set followed by the selected
    /// non-core activity, if any.
    #[must_use]
    pub fn active_activities(&self) -> &[Activity] {
        &self.active
    }

    /// The selected non-core activity, if any.
    #[must_use]
    pub fn active_non_core_activity(&self) -> Option<Activity> {
        self.active.iter().copied().find(|a| !self.core.contains(a))
    }

    /// Activities that are always active.
    #[must_use]
    pub fn core_activities(&self) -> &[Activity] {
        &self.core
    }

    /// The fallback activity.
    #[must_use]
    pub fn default_activity(&self) -> Activity {
        self.default
    }

    /// The daily schedule.
    #[must_use]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Whether `activity` is known to this brain and its requirement holds.
    #[must_use]
    pub fn requirements_met(&self, activity: Activity, memory: &MemoryStore) -> bool {
        self.requirements
            .get(&activity)
            .is_some_and(|requirement| requirement.is_met(memory))
    }

    /// Activate `activity` if eligible, else fall back to the default.
    pub fn set_active_activity_if_possible(&mut self, activity: Activity, memory: &mut MemoryStore) {
        if self.requirements_met(activity, memory) {
            self.set_active_activity(activity, memory);
        } else {
            debug!(requested = %activity, fallback = %self.default, "Activity not eligible, using default");
            self.use_default_activity(memory);
        }
    }

    /// Activate the first eligible activity of `activities`; no-op if none is.
    pub fn set_active_activity_to_first_valid(&mut self, activities: &[Activity], memory: &mut MemoryStore) {
        if let Some(&activity) = activities.iter().find(|&&a| self.requirements_met(a, memory)) {
            self.set_active_activity(activity, memory);
        }
    }

    /// Activate the default activity unconditionally.
    pub fn use_default_activity(&mut self, memory: &mut MemoryStore) {
        self.set_active_activity(self.default, memory);
    }

    /// Consult the schedule, at most once per update interval.
    ///
    /// Returns whether the schedule was actually evaluated.
    pub fn update_from_schedule(&mut self, day_time: u64, game_time: u64, memory: &mut MemoryStore) -> bool {
        if let Some(last) = self.last_schedule_update {
            if game_time >= last && game_time - last < self.schedule_interval {
                return false;
            }
        }
        self.last_schedule_update = Some(game_time);
        metrics::counters().schedule_evaluations.fetch_add(1, AtomicOrdering::Relaxed);

        if let Some(activity) = self.schedule.activity_at(day_time) {
            if !self.is_active(activity) {
                debug!(%activity, day_time, "Schedule requests activity");
                self.set_active_activity_if_possible(activity, memory);
            }
        }
        true
    }

    fn set_active_activity(&mut self, activity: Activity, memory: &mut MemoryStore) {
        if self.is_active(activity) {
            return;
        }
        let previous = self.active_non_core_activity();
        for &leaving in &self.active {
            if leaving == activity || self.core.contains(&leaving) {
                continue;
            }
            if let Some(rule) = self.cleanup.get(&leaving) {
                rule.apply(memory);
            }
        }
        self.active.clear();
        self.active.extend_from_slice(&self.core);
        self.active.push(activity);

        metrics::counters().activity_switches.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(
            from = previous.map_or("none", Activity::name),
            to = %activity,
            "Switched activity"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        idle: Activity,
        fight: Activity,
        panic: Activity,
        core: Activity,
        target: MemoryModuleType<u32>,
        fight_scratch: MemoryModuleType<u32>,
        memory: MemoryStore,
        selector: ActivitySelector,
    }

    fn fixture() -> Fixture {
        let idle = Activity::new("idle");
        let fight = Activity::new("fight");
        let panic = Activity::new("panic");
        let core = Activity::new("core");
        let target = MemoryModuleType::<u32>::new("target");
        let fight_scratch = MemoryModuleType::<u32>::new("fight_scratch");

        let mut memory = MemoryStore::new();
        memory.register(&target);
        memory.register(&fight_scratch);

        let mut requirements = HashMap::new();
        requirements.insert(idle, ActivityRequirement::new());
        requirements.insert(core, ActivityRequirement::new());
        requirements.insert(fight, ActivityRequirement::new().value_present(&target));
        requirements.insert(panic, ActivityRequirement::new().value_absent(&target));
        let mut cleanup = HashMap::new();
        cleanup.insert(fight, ActivityCleanupRule::new().erase(&fight_scratch));

        let selector = ActivitySelector::new(requirements, cleanup, vec![core], idle, Schedule::empty(), 20);
        Fixture {
            idle,
            fight,
            panic,
            core,
            target,
            fight_scratch,
            memory,
            selector,
        }
    }

    #[test]
    fn starts_with_core_and_default() {
        let f = fixture();
        assert_eq!(f.selector.active_activities(), &[f.core, f.idle]);
        assert_eq!(f.selector.active_non_core_activity(), Some(f.idle));
    }

    #[test]
    fn ineligible_request_falls_back_to_default() {
        let mut f = fixture();
        f.memory.set(&f.target, 1);
        f.selector.set_active_activity_if_possible(f.fight, &mut f.memory);
        assert!(f.selector.is_active(f.fight));

        f.memory.erase(&f.target);
        f.selector.set_active_activity_if_possible(f.fight, &mut f.memory);
        assert!(!f.selector.is_active(f.fight));
        assert!(f.selector.is_active(f.idle));
        assert!(f.selector.is_active(f.core));
        assert_eq!(f.selector.active_activities().len(), 2);
    }

    #[test]
    fn unknown_activity_is_never_eligible() {
        let mut f = fixture();
        let stranger = Activity::new("stranger");
        f.selector.set_active_activity_if_possible(f.fight, &mut f.memory);
        f.selector.set_active_activity_if_possible(stranger, &mut f.memory);
        assert!(!f.selector.is_active(stranger));
        assert!(f.selector.is_active(f.idle));
    }

    #[test]
    fn leaving_activity_runs_cleanup() {
        let mut f = fixture();
        f.memory.set(&f.target, 1);
        f.selector.set_active_activity_if_possible(f.fight, &mut f.memory);
        f.memory.set(&f.fight_scratch, 99);

        f.selector.use_default_activity(&mut f.memory);
        assert!(!f.memory.has_value(&f.fight_scratch));
        // Not in the cleanup rule.
        assert!(f.memory.has_value(&f.target));
    }

    #[test]
    fn first_valid_skips_ineligible_and_ignores_empty() {
        let mut f = fixture();
        f.selector.set_active_activity_to_first_valid(&[f.fight, f.panic], &mut f.memory);
        assert!(f.selector.is_active(f.panic));

        f.memory.set(&f.target, 3);
        f.selector.set_active_activity_to_first_valid(&[f.panic], &mut f.memory);
        assert!(f.selector.is_active(f.panic), "no eligible entry means no change");
    }

    #[test]
    fn schedule_updates_are_throttled() {
        let mut f = fixture();
        let mut evaluations = 0;
        for t in 0..100 {
            if f.selector.update_from_schedule(t, t, &mut f.memory) {
                evaluations += 1;
            }
        }
        assert_eq!(evaluations, 5);
    }
}
