//! Declarative brain construction.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::Brain;
use crate::activity::{Activity, ActivityCleanupRule, ActivityRequirement, ActivitySelector};
use crate::config::{BrainConfig, SchedulerConfig, SensorConfig};
use crate::error::{BrainError, Result};
use crate::memory::{MemoryKey, MemoryModuleType, MemoryStore, MemoryValue};
use crate::metrics::TickBudget;
use crate::persistence::SlotCodec;
use crate::schedule::Schedule;
use crate::sensor::{Sensor, SensorRegistry};
use crate::task::{Task, TaskTable};

/// Tasks of one activity, as `(priority, task)` pairs.
pub type ActivityTasks<W, A> = Vec<(i32, Box<dyn Task<W, A>>)>;

/// Everything needed to build a [`Brain`].
///
/// ```rust,ignore
/// let brain = BrainProfile::new(*IDLE)
///     .memory(&NEAREST_HOSTILE)
///     .sensor(NearestEntitiesSensor::new(16.0))
///     .add_activity(*IDLE, vec![(0, Box::new(wander()))])
///     .add_activity_with_conditions(
///         *FIGHT,
///         vec![(0, Box::new(melee()))],
///         ActivityRequirement::new().value_present(&ATTACK_TARGET),
///     )
///     .build()?;
/// ```
pub struct BrainProfile<W, A> {
    default_activity: Activity,
    core: Vec<Activity>,
    memories: Vec<MemoryKey>,
    persistent: Vec<(MemoryKey, SlotCodec)>,
    sensors: Vec<(Box<dyn Sensor<W, A>>, Option<u64>)>,
    tasks: TaskTable<W, A>,
    requirements: HashMap<Activity, ActivityRequirement>,
    cleanup: HashMap<Activity, ActivityCleanupRule>,
    schedule: Schedule,
    scheduler: SchedulerConfig,
    sensor_config: SensorConfig,
    tick_budget: TickBudget,
}

impl<W, A> BrainProfile<W, A> {
    /// Start a profile whose fallback activity is `default_activity`.
    #[must_use]
    pub fn new(default_activity: Activity) -> Self {
        let config = BrainConfig::default();
        Self {
            default_activity,
            core: Vec::new(),
            memories: Vec::new(),
            persistent: Vec::new(),
            sensors: Vec::new(),
            tasks: TaskTable::new(),
            requirements: HashMap::new(),
            cleanup: HashMap::new(),
            schedule: Schedule::empty(),
            scheduler: config.scheduler,
            sensor_config: config.sensors,
            tick_budget: TickBudget::from_micros(config.telemetry.log_slow_ticks_us),
        }
    }

    /// Take scheduler, sensor and telemetry settings from `config`.
    #[must_use]
    pub fn with_config(mut self, config: &BrainConfig) -> Self {
        self.scheduler = config.scheduler.clone();
        self.sensor_config = config.sensors.clone();
        self.tick_budget = TickBudget::from_micros(config.telemetry.log_slow_ticks_us);
        self
    }

    /// Register a memory slot.
    #[must_use]
    pub fn memory<T: MemoryValue>(mut self, slot: &MemoryModuleType<T>) -> Self {
        self.memories.push(slot.key());
        self
    }

    /// Register a memory slot that is included in snapshots.
    #[must_use]
    pub fn persistent_memory<T>(mut self, slot: &MemoryModuleType<T>) -> Self
    where
        T: MemoryValue + Serialize + DeserializeOwned,
    {
        self.persistent.push((slot.key(), SlotCodec::of::<T>()));
        self
    }

    /// Add a sensor at the configured default scan rate. Its required slots
    /// are registered.
    #[must_use]
    pub fn sensor(mut self, sensor: impl Sensor<W, A> + 'static) -> Self {
        self.sensors.push((Box::new(sensor), None));
        self
    }

    /// Add a sensor that refreshes every `scan_rate` brain ticks.
    #[must_use]
    pub fn sensor_with_scan_rate(mut self, sensor: impl Sensor<W, A> + 'static, scan_rate: u64) -> Self {
        self.sensors.push((Box::new(sensor), Some(scan_rate)));
        self
    }

    /// Add one task. The activity becomes known with no requirement unless
    /// one is added later.
    #[must_use]
    pub fn task(mut self, priority: i32, activity: Activity, task: impl Task<W, A> + 'static) -> Self {
        self.tasks.push(priority, activity, Box::new(task));
        self.requirements.entry(activity).or_default();
        self
    }

    /// Add tasks for an activity with no entry requirement.
    #[must_use]
    pub fn add_activity(self, activity: Activity, tasks: ActivityTasks<W, A>) -> Self {
        self.add_activity_with_conditions(activity, tasks, ActivityRequirement::new())
    }

    /// Add tasks for an activity that is only eligible while `requirement`
    /// holds.
    #[must_use]
    pub fn add_activity_with_conditions(
        self,
        activity: Activity,
        tasks: ActivityTasks<W, A>,
        requirement: ActivityRequirement,
    ) -> Self {
        self.add_activity_and_remove_memories_when_stopped(activity, tasks, requirement, ActivityCleanupRule::new())
    }

    /// Add tasks for an activity, its requirement, and the memories erased
    /// when the brain switches away from it.
    ///
    /// Registering the same activity again adds to what is already there:
    /// requirement conditions and cleanup slots accumulate.
    #[must_use]
    pub fn add_activity_and_remove_memories_when_stopped(
        mut self,
        activity: Activity,
        tasks: ActivityTasks<W, A>,
        requirement: ActivityRequirement,
        cleanup: ActivityCleanupRule,
    ) -> Self {
        for (priority, task) in tasks {
            self.tasks.push(priority, activity, task);
        }
        self.requirements.entry(activity).or_default().merge(requirement);
        self.cleanup.entry(activity).or_default().merge(cleanup);
        self
    }

    /// Set the always-active activities.
    #[must_use]
    pub fn core_activities(mut self, activities: impl IntoIterator<Item = Activity>) -> Self {
        self.core = activities.into_iter().collect();
        self
    }

    /// Set the daily schedule.
    #[must_use]
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Build the brain.
    ///
    /// # Errors
    ///
    /// [`BrainError::DuplicateSlotName`] when two persistent slots share a
    /// name, since their snapshot entries would overwrite each other.
    pub fn build(self) -> Result<Brain<W, A>> {
        let mut names = HashSet::new();
        for (key, _) in &self.persistent {
            if !names.insert(key.name()) {
                return Err(BrainError::DuplicateSlotName {
                    name: key.name().to_string(),
                });
            }
        }

        let mut memory = MemoryStore::new();
        for &key in &self.memories {
            memory.register_key(key);
        }
        for &(key, codec) in &self.persistent {
            memory.register_persistent(key, codec);
        }

        let mut rng = StdRng::seed_from_u64(self.sensor_config.seed);
        let default_rate = self.sensor_config.default_scan_rate.max(1);
        let mut sensors = SensorRegistry::new();
        for (sensor, scan_rate) in self.sensors {
            for key in sensor.requires() {
                memory.register_key(key);
            }
            let scan_rate = scan_rate.unwrap_or(default_rate).max(1);
            let phase = if self.sensor_config.randomize_initial_phase {
                rng.gen_range(1..=scan_rate)
            } else {
                1
            };
            sensors.push(sensor, scan_rate, phase);
        }

        let mut requirements = self.requirements;
        for &activity in self.core.iter().chain(std::iter::once(&self.default_activity)) {
            requirements.entry(activity).or_default();
        }

        let activities = ActivitySelector::new(
            requirements,
            self.cleanup,
            self.core,
            self.default_activity,
            self.schedule.with_default_day_length(self.scheduler.ticks_per_day),
            self.scheduler.schedule_update_interval_ticks,
        );

        debug!(
            slots = memory.registered_slots().count(),
            sensors = sensors.len(),
            tasks = self.tasks.len(),
            default = %self.default_activity,
            "Built brain"
        );
        Ok(Brain::from_parts(memory, sensors, self.tasks, activities, self.tick_budget))
    }
}
