use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::Ordering;

use serde::Serialize;

use super::{Task, TaskContext, TaskStatus};
use crate::activity::{Activity, ActivitySelector};
use crate::memory::MemoryStore;
use crate::metrics;

struct TaskEntry<W, A> {
    priority: i32,
    activity: Activity,
    task: Box<dyn Task<W, A>>,
}

/// A task as seen from outside the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskInfo {
    /// Task name.
    pub name: &'static str,
    /// Activity the task belongs to.
    pub activity: &'static str,
    /// Priority bucket (lower runs first).
    pub priority: i32,
    /// Lifecycle state.
    pub status: TaskStatus,
}

/// Tasks grouped by priority, then activity, then registration order.
///
/// Built once; only task state changes afterwards.
pub struct TaskTable<W, A> {
    entries: Vec<TaskEntry<W, A>>,
    buckets: BTreeMap<i32, Vec<(Activity, Vec<usize>)>>,
}

impl<W, A> Default for TaskTable<W, A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            buckets: BTreeMap::new(),
        }
    }
}

impl<W, A> fmt::Debug for TaskTable<W, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.infos()).finish()
    }
}

impl<W, A> TaskTable<W, A> {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task under `priority` and `activity`.
    pub fn push(&mut self, priority: i32, activity: Activity, task: Box<dyn Task<W, A>>) {
        let idx = self.entries.len();
        self.entries.push(TaskEntry { priority, activity, task });
        let groups = self.buckets.entry(priority).or_default();
        match groups.iter_mut().find(|(a, _)| *a == activity) {
            Some((_, indices)) => indices.push(idx),
            None => groups.push((activity, vec![idx])),
        }
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every activity that owns at least one task.
    pub fn activities(&self) -> impl Iterator<Item = Activity> + '_ {
        self.buckets.values().flatten().map(|(activity, _)| *activity)
    }

    /// Call `try_start` on every STOPPED task of an active activity.
    ///
    /// Activity membership is checked per group at the moment the group is
    /// reached, so a task that switches activity affects later groups.
    /// Returns the number of tasks started.
    pub fn start_eligible(
        &mut self,
        world: &W,
        actor: &mut A,
        memory: &mut MemoryStore,
        activities: &mut ActivitySelector,
        now: u64,
    ) -> usize {
        let mut started = 0;
        for (activity, indices) in self.buckets.values().flatten() {
            if !activities.is_active(*activity) {
                continue;
            }
            for &idx in indices {
                let task = &mut self.entries[idx].task;
                if task.status() != TaskStatus::Stopped {
                    continue;
                }
                let mut ctx = TaskContext {
                    world,
                    actor: &mut *actor,
                    memory: &mut *memory,
                    activities: &mut *activities,
                    now,
                };
                if task.try_start(&mut ctx) {
                    started += 1;
                }
            }
        }
        metrics::counters().tasks_started.fetch_add(started as u64, Ordering::Relaxed);
        started
    }

    /// Call `tick_or_stop` on every RUNNING task, in priority order.
    ///
    /// Returns the number of tasks that stopped.
    pub fn tick_running(
        &mut self,
        world: &W,
        actor: &mut A,
        memory: &mut MemoryStore,
        activities: &mut ActivitySelector,
        now: u64,
    ) -> usize {
        let mut stopped = 0;
        for (_, indices) in self.buckets.values().flatten() {
            for &idx in indices {
                let task = &mut self.entries[idx].task;
                if task.status() != TaskStatus::Running {
                    continue;
                }
                let mut ctx = TaskContext {
                    world,
                    actor: &mut *actor,
                    memory: &mut *memory,
                    activities: &mut *activities,
                    now,
                };
                task.tick_or_stop(&mut ctx);
                if task.status() == TaskStatus::Stopped {
                    stopped += 1;
                }
            }
        }
        metrics::counters().tasks_stopped.fetch_add(stopped as u64, Ordering::Relaxed);
        stopped
    }

    /// Force every RUNNING task to stop. Returns how many were stopped.
    pub fn stop_all(
        &mut self,
        world: &W,
        actor: &mut A,
        memory: &mut MemoryStore,
        activities: &mut ActivitySelector,
        now: u64,
    ) -> usize {
        let mut stopped = 0;
        for entry in &mut self.entries {
            if entry.task.status() != TaskStatus::Running {
                continue;
            }
            let mut ctx = TaskContext {
                world,
                actor: &mut *actor,
                memory: &mut *memory,
                activities: &mut *activities,
                now,
            };
            entry.task.do_stop(&mut ctx);
            stopped += 1;
        }
        metrics::counters().tasks_stopped.fetch_add(stopped as u64, Ordering::Relaxed);
        stopped
    }

    /// Every task in scheduling order.
    pub fn infos(&self) -> impl Iterator<Item = TaskInfo> + '_ {
        self.buckets
            .values()
            .flatten()
            .flat_map(|(_, indices)| indices.iter())
            .map(|&idx| {
                let entry = &self.entries[idx];
                TaskInfo {
                    name: entry.task.name(),
                    activity: entry.activity.name(),
                    priority: entry.priority,
                    status: entry.task.status(),
                }
            })
    }

    /// RUNNING tasks in scheduling order.
    pub fn running(&self) -> impl Iterator<Item = TaskInfo> + '_ {
        self.infos().filter(|info| info.status == TaskStatus::Running)
    }
}
