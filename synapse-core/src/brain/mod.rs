//! The per-actor brain: memory, sensors, tasks and activities, ticked as one.
//!
//! Each [`Brain::tick`] runs, in order:
//!
//! 1. memory aging (expired memories are erased),
//! 2. sensors, in registration order, respecting scan rates,
//! 3. a start pass over STOPPED tasks of active activities, by priority,
//! 4. a run pass over every RUNNING task, by priority.
//!
//! Tasks started in step 3 are already ticked in step 4 of the same call.
//! The brain never preempts a running task; deactivating an activity only
//! keeps its tasks from starting again.

mod profile;

pub use profile::{ActivityTasks, BrainProfile};

use std::sync::atomic::Ordering;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, trace, trace_span, warn};

use crate::activity::{Activity, ActivitySelector};
use crate::memory::{MemoryKey, MemoryModuleType, MemoryStatus, MemoryStore, MemoryValue};
use crate::metrics::{self, TickBudget};
use crate::persistence::MemorySnapshot;
use crate::sensor::SensorRegistry;
use crate::task::{TaskInfo, TaskTable};
use crate::types::GameClock;

/// An actor's decision-making core. Built with [`BrainProfile`].
pub struct Brain<W, A> {
    memory: MemoryStore,
    sensors: SensorRegistry<W, A>,
    tasks: TaskTable<W, A>,
    activities: ActivitySelector,
    tick_budget: TickBudget,
    ticks: u64,
}

impl<W, A> std::fmt::Debug for Brain<W, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Brain")
            .field("ticks", &self.ticks)
            .field("active", &self.activities.active_activities())
            .field("memory", &self.memory)
            .field("sensors", &self.sensors)
            .field("tasks", &self.tasks)
            .finish()
    }
}

/// Present memory as shown by [`Brain::debug_info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryDebugEntry {
    /// Slot name.
    pub slot: &'static str,
    /// Remaining ticks, `None` if the memory never expires.
    pub ttl: Option<u64>,
}

/// A serializable view of a brain for debug overlays and logs.
#[derive(Debug, Clone, Serialize)]
pub struct BrainDebugInfo {
    /// Brain ticks completed.
    pub ticks: u64,
    /// Active activities, core first.
    pub active_activities: Vec<&'static str>,
    /// Present memories.
    pub memories: Vec<MemoryDebugEntry>,
    /// Sensor names.
    pub sensors: Vec<&'static str>,
    /// RUNNING tasks.
    pub running_tasks: Vec<TaskInfo>,
}

impl<W, A> Brain<W, A> {
    pub(crate) fn from_parts(
        memory: MemoryStore,
        sensors: SensorRegistry<W, A>,
        tasks: TaskTable<W, A>,
        activities: ActivitySelector,
        tick_budget: TickBudget,
    ) -> Self {
        Self {
            memory,
            sensors,
            tasks,
            activities,
            tick_budget,
            ticks: 0,
        }
    }

    // ------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------

    /// Run one full brain tick.
    pub fn tick(&mut self, world: &W, actor: &mut A)
    where
        W: GameClock,
    {
        let now = world.game_time();
        let _span = trace_span!("synapse::brain::tick", now).entered();
        let begin = Instant::now();

        let expired = self.memory.age_all();
        let refreshed = self.sensors.tick_all(world, actor, &mut self.memory, now);
        let started = self
            .tasks
            .start_eligible(world, actor, &mut self.memory, &mut self.activities, now);
        let stopped = self
            .tasks
            .tick_running(world, actor, &mut self.memory, &mut self.activities, now);
        self.ticks += 1;

        let counters = metrics::counters();
        counters.brain_ticks.fetch_add(1, Ordering::Relaxed);
        counters.memories_expired.fetch_add(expired as u64, Ordering::Relaxed);
        counters.sensor_refreshes.fetch_add(refreshed as u64, Ordering::Relaxed);

        let elapsed_us = metrics::elapsed_us(begin);
        if self.tick_budget.is_exceeded(elapsed_us) {
            counters.slow_brain_ticks.fetch_add(1, Ordering::Relaxed);
            warn!(now, elapsed_us, budget_us = self.tick_budget.as_micros(), "Slow brain tick");
        }
        trace!(now, expired, refreshed, started, stopped, "brain tick complete");
    }

    /// Consult the schedule; throttled to one evaluation per update interval.
    ///
    /// Returns whether the schedule was evaluated.
    pub fn update_activity_from_schedule(&mut self, day_time: u64, game_time: u64) -> bool {
        self.activities
            .update_from_schedule(day_time, game_time, &mut self.memory)
    }

    /// Force every RUNNING task to stop.
    pub fn stop_all(&mut self, world: &W, actor: &mut A)
    where
        W: GameClock,
    {
        let now = world.game_time();
        let stopped = self
            .tasks
            .stop_all(world, actor, &mut self.memory, &mut self.activities, now);
        if stopped > 0 {
            debug!(stopped, now, "Stopped all running tasks");
        }
    }

    /// Brain ticks completed.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    // ------------------------------------------------------------------
    // Activities
    // ------------------------------------------------------------------

    /// Activate `activity` if eligible, otherwise the default activity.
    pub fn set_active_activity_if_possible(&mut self, activity: Activity) {
        self.activities
            .set_active_activity_if_possible(activity, &mut self.memory);
    }

    /// Activate the first eligible activity of `activities`.
    pub fn set_active_activity_to_first_valid(&mut self, activities: &[Activity]) {
        self.activities
            .set_active_activity_to_first_valid(activities, &mut self.memory);
    }

    /// Activate the default activity.
    pub fn use_default_activity(&mut self) {
        self.activities.use_default_activity(&mut self.memory);
    }

    /// Whether `activity` is active.
    #[must_use]
    pub fn is_active(&self, activity: Activity) -> bool {
        self.activities.is_active(activity)
    }

    /// Active activities, core first.
    #[must_use]
    pub fn active_activities(&self) -> &[Activity] {
        self.activities.active_activities()
    }

    /// The active non-core activity, if any.
    #[must_use]
    pub fn active_non_core_activity(&self) -> Option<Activity> {
        self.activities.active_non_core_activity()
    }

    /// The fallback activity.
    #[must_use]
    pub fn default_activity(&self) -> Activity {
        self.activities.default_activity()
    }

    /// Always-active activities.
    #[must_use]
    pub fn core_activities(&self) -> &[Activity] {
        self.activities.core_activities()
    }

    // ------------------------------------------------------------------
    // Memory
    // ------------------------------------------------------------------

    /// The memory store.
    #[must_use]
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// The memory store, mutably.
    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut self.memory
    }

    /// Read a memory.
    #[must_use]
    pub fn get_memory<T: MemoryValue>(&self, slot: &MemoryModuleType<T>) -> Option<&T> {
        self.memory.get(slot)
    }

    /// Write a memory that never expires.
    pub fn set_memory<T: MemoryValue>(&mut self, slot: &MemoryModuleType<T>, value: T) {
        self.memory.set(slot, value);
    }

    /// Write a memory that expires after `ttl` ticks.
    pub fn set_memory_with_expiry<T: MemoryValue>(&mut self, slot: &MemoryModuleType<T>, value: T, ttl: u64) {
        self.memory.set_with_expiry(slot, value, ttl);
    }

    /// Write `Some` or erase on `None`.
    pub fn set_memory_optional<T: MemoryValue>(&mut self, slot: &MemoryModuleType<T>, value: Option<T>) {
        self.memory.set_optional(slot, value);
    }

    /// Clear a memory.
    pub fn erase_memory<T>(&mut self, slot: &MemoryModuleType<T>) {
        self.memory.erase(slot);
    }

    /// Whether `slot` holds a value.
    #[must_use]
    pub fn has_memory_value<T>(&self, slot: &MemoryModuleType<T>) -> bool {
        self.memory.has_value(slot)
    }

    /// Whether `slot` holds exactly `value`.
    #[must_use]
    pub fn is_memory_value<T: MemoryValue + PartialEq>(&self, slot: &MemoryModuleType<T>, value: &T) -> bool {
        self.memory.is_value(slot, value)
    }

    /// Check a slot against a status; false for unregistered slots.
    #[must_use]
    pub fn check_memory(&self, key: MemoryKey, status: MemoryStatus) -> bool {
        self.memory.has(key, status)
    }

    // ------------------------------------------------------------------
    // Introspection & persistence
    // ------------------------------------------------------------------

    /// RUNNING tasks in scheduling order.
    #[must_use]
    pub fn running_tasks(&self) -> Vec<TaskInfo> {
        self.tasks.running().collect()
    }

    /// Every task with its status, in scheduling order.
    #[must_use]
    pub fn task_statuses(&self) -> Vec<TaskInfo> {
        self.tasks.infos().collect()
    }

    /// A serializable snapshot of the brain's state.
    #[must_use]
    pub fn debug_info(&self) -> BrainDebugInfo {
        BrainDebugInfo {
            ticks: self.ticks,
            active_activities: self.active_activities().iter().map(|a| a.name()).collect(),
            memories: self
                .memory
                .present_entries()
                .map(|(key, ttl)| MemoryDebugEntry { slot: key.name(), ttl })
                .collect(),
            sensors: self.sensors.names().collect(),
            running_tasks: self.running_tasks(),
        }
    }

    /// Export persistent memories.
    #[must_use]
    pub fn snapshot_memories(&self) -> MemorySnapshot {
        self.memory.snapshot()
    }

    /// Load persistent memories; returns how many were restored.
    pub fn restore_memories(&mut self, snapshot: &MemorySnapshot) -> usize {
        let restored = self.memory.restore(snapshot);
        debug!(restored, offered = snapshot.len(), "Restored brain memories");
        restored
    }
}
