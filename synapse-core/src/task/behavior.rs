use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use super::{Task, TaskContext, TaskStatus};
use crate::memory::{MemoryKey, MemoryModuleType, MemoryStatus};

/// The behavior-specific half of a task.
///
/// Every hook has a default, so a one-shot behavior only needs `name` and
/// `start`: with `can_continue` returning `false` it stops on the first
/// `tick_or_stop` after starting.
pub trait BehaviorLogic<W, A>: Send {
    /// Name for logs and debug views.
    fn name(&self) -> &'static str;

    /// Extra precondition checked after the entry conditions.
    fn can_start(&mut self, _ctx: &TaskContext<'_, W, A>) -> bool {
        true
    }

    /// Side effects of starting.
    fn start(&mut self, _ctx: &mut TaskContext<'_, W, A>) {}

    /// Whether to keep running.
    fn can_continue(&mut self, _ctx: &TaskContext<'_, W, A>) -> bool {
        false
    }

    /// One unit of work.
    fn tick(&mut self, _ctx: &mut TaskContext<'_, W, A>) {}

    /// Side effects of stopping.
    fn stop(&mut self, _ctx: &mut TaskContext<'_, W, A>) {}
}

/// Adapts a [`BehaviorLogic`] to the [`Task`] contract, adding memory entry
/// conditions and an optional randomized run duration.
pub struct Behavior<L> {
    logic: L,
    status: TaskStatus,
    entry_conditions: Vec<(MemoryKey, MemoryStatus)>,
    duration: Option<(u64, u64)>,
    rng: StdRng,
    started_at: Option<u64>,
    end_at: u64,
}

impl<L> Behavior<L> {
    /// Wrap `logic` with no entry conditions and no duration limit.
    pub fn new(logic: L) -> Self {
        Self {
            logic,
            status: TaskStatus::Stopped,
            entry_conditions: Vec::new(),
            duration: None,
            rng: StdRng::seed_from_u64(0),
            started_at: None,
            end_at: 0,
        }
    }

    /// Require `key` to be in `status` before starting.
    #[must_use]
    pub fn with_condition(mut self, key: MemoryKey, status: MemoryStatus) -> Self {
        self.entry_conditions.push((key, status));
        self
    }

    /// Require `slot` to hold a value before starting.
    #[must_use]
    pub fn requires_value<T>(self, slot: &MemoryModuleType<T>) -> Self {
        self.with_condition(slot.key(), MemoryStatus::ValuePresent)
    }

    /// Require `slot` to be empty before starting.
    #[must_use]
    pub fn requires_absent<T>(self, slot: &MemoryModuleType<T>) -> Self {
        self.with_condition(slot.key(), MemoryStatus::ValueAbsent)
    }

    /// Limit each run to a duration drawn from `min..=max` ticks.
    #[must_use]
    pub fn with_duration(mut self, min: u64, max: u64) -> Self {
        self.duration = Some((min.min(max), min.max(max)));
        self
    }

    /// Seed the duration RNG.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The wrapped logic.
    pub fn logic(&self) -> &L {
        &self.logic
    }

    /// The wrapped logic, mutably.
    pub fn logic_mut(&mut self) -> &mut L {
        &mut self.logic
    }

    /// Tick at which the current or last run started.
    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    /// Memory conditions checked before starting.
    pub fn entry_conditions(&self) -> &[(MemoryKey, MemoryStatus)] {
        &self.entry_conditions
    }

    /// Box as a task object, for activity task lists.
    pub fn boxed<W, A>(self) -> Box<dyn Task<W, A>>
    where
        L: BehaviorLogic<W, A> + 'static,
    {
        Box::new(self)
    }

    fn timed_out(&self, now: u64) -> bool {
        self.duration.is_some() && now > self.end_at
    }
}

impl<W, A, L: BehaviorLogic<W, A>> Task<W, A> for Behavior<L> {
    fn name(&self) -> &'static str {
        self.logic.name()
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn try_start(&mut self, ctx: &mut TaskContext<'_, W, A>) -> bool {
        if self.status != TaskStatus::Stopped {
            return false;
        }
        let conditions_met = self
            .entry_conditions
            .iter()
            .all(|&(key, status)| ctx.memory.has(key, status));
        if !conditions_met || !self.logic.can_start(ctx) {
            return false;
        }

        self.status = TaskStatus::Running;
        self.started_at = Some(ctx.now);
        if let Some((min, max)) = self.duration {
            self.end_at = ctx.now.saturating_add(self.rng.gen_range(min..=max));
        }
        trace!(task = self.logic.name(), now = ctx.now, "task started");
        self.logic.start(ctx);
        true
    }

    fn tick_or_stop(&mut self, ctx: &mut TaskContext<'_, W, A>) {
        if self.status != TaskStatus::Running {
            return;
        }
        if !self.timed_out(ctx.now) && self.logic.can_continue(ctx) {
            self.logic.tick(ctx);
        } else {
            self.do_stop(ctx);
        }
    }

    fn do_stop(&mut self, ctx: &mut TaskContext<'_, W, A>) {
        if self.status != TaskStatus::Running {
            return;
        }
        self.status = TaskStatus::Stopped;
        trace!(task = self.logic.name(), now = ctx.now, "task stopped");
        self.logic.stop(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Activity, ActivitySelector};
    use crate::memory::MemoryStore;
    use crate::schedule::Schedule;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Log {
        starts: u32,
        ticks: u32,
        stops: u32,
        keep_going: bool,
    }

    impl BehaviorLogic<(), ()> for Log {
        fn name(&self) -> &'static str {
            "log"
        }

        fn start(&mut self, _ctx: &mut TaskContext<'_, (), ()>) {
            self.starts += 1;
        }

        fn can_continue(&mut self, _ctx: &TaskContext<'_, (), ()>) -> bool {
            self.keep_going
        }

        fn tick(&mut self, _ctx: &mut TaskContext<'_, (), ()>) {
            self.ticks += 1;
        }

        fn stop(&mut self, _ctx: &mut TaskContext<'_, (), ()>) {
            self.stops += 1;
        }
    }

    struct Harness {
        memory: MemoryStore,
        activities: ActivitySelector,
        actor: (),
    }

    impl Harness {
        fn new() -> Self {
            let idle = Activity::new("idle");
            let mut requirements = HashMap::new();
            requirements.insert(idle, crate::activity::ActivityRequirement::new());
            Self {
                memory: MemoryStore::new(),
                activities: ActivitySelector::new(requirements, HashMap::new(), Vec::new(), idle, Schedule::empty(), 20),
                actor: (),
            }
        }

        fn ctx(&mut self, now: u64) -> TaskContext<'_, (), ()> {
            TaskContext {
                world: &(),
                actor: &mut self.actor,
                memory: &mut self.memory,
                activities: &mut self.activities,
                now,
            }
        }
    }

    #[test]
    fn one_shot_stops_on_first_tick() {
        let mut h = Harness::new();
        let mut task = Behavior::new(Log::default());
        assert!(task.try_start(&mut h.ctx(0)));
        assert_eq!(task.status(), TaskStatus::Running);
        task.tick_or_stop(&mut h.ctx(0));
        assert_eq!(task.status(), TaskStatus::Stopped);
        assert_eq!((task.logic().starts, task.logic().ticks, task.logic().stops), (1, 0, 1));
    }

    #[test]
    fn unmet_entry_condition_has_no_side_effects() {
        let mut h = Harness::new();
        let target = MemoryModuleType::<u32>::new("target");
        h.memory.register(&target);
        let mut task = Behavior::new(Log::default()).requires_value(&target);

        assert!(!task.try_start(&mut h.ctx(0)));
        assert_eq!(task.status(), TaskStatus::Stopped);
        assert_eq!(task.logic().starts, 0);
        assert_eq!(task.started_at(), None);

        h.memory.set(&target, 7);
        assert!(task.try_start(&mut h.ctx(3)));
        assert_eq!(task.started_at(), Some(3));
    }

    #[test]
    fn start_is_refused_while_running() {
        let mut h = Harness::new();
        let mut task = Behavior::new(Log {
            keep_going: true,
            ..Log::default()
        });
        assert!(task.try_start(&mut h.ctx(0)));
        assert!(!task.try_start(&mut h.ctx(1)));
        assert_eq!(task.logic().starts, 1);
    }

    #[test]
    fn duration_window_times_out() {
        let mut h = Harness::new();
        let mut task = Behavior::new(Log {
            keep_going: true,
            ..Log::default()
        })
        .with_duration(3, 3);

        assert!(task.try_start(&mut h.ctx(10)));
        for now in 10..=13 {
            task.tick_or_stop(&mut h.ctx(now));
            assert_eq!(task.status(), TaskStatus::Running, "still inside window at {now}");
        }
        task.tick_or_stop(&mut h.ctx(14));
        assert_eq!(task.status(), TaskStatus::Stopped);
        assert_eq!(task.logic().ticks, 4);
    }

    #[test]
    fn seeded_durations_are_reproducible() {
        let draw = |seed| {
            let mut h = Harness::new();
            let mut task = Behavior::new(Log {
                keep_going: true,
                ..Log::default()
            })
            .with_duration(5, 50)
            .with_seed(seed);
            task.try_start(&mut h.ctx(0));
            let mut now = 0;
            while task.status() == TaskStatus::Running {
                now += 1;
                task.tick_or_stop(&mut h.ctx(now));
            }
            now
        };
        assert_eq!(draw(42), draw(42));
        assert!((6..=51).contains(&draw(7)));
    }

    #[test]
    fn do_stop_is_idempotent() {
        let mut h = Harness::new();
        let mut task = Behavior::new(Log {
            keep_going: true,
            ..Log::default()
        });
        task.try_start(&mut h.ctx(0));
        task.do_stop(&mut h.ctx(1));
        task.do_stop(&mut h.ctx(2));
        assert_eq!(task.logic().stops, 1);
        assert_eq!(task.status(), TaskStatus::Stopped);
    }
}
