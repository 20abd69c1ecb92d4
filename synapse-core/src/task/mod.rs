//! The task lifecycle contract.
//!
//! A task is a small state machine with two states:
//!
//! ```text
//!   STOPPED ──try_start (preconditions met)──▶ RUNNING
//!      ▲                                          │
//!      └──────── tick_or_stop (should stop) ──────┤
//!      └──────────────── do_stop ─────────────────┘
//! ```
//!
//! The brain drives tasks only through this trait; concrete behaviors decide
//! their own preconditions and continue-conditions. Most behaviors implement
//! the smaller [`BehaviorLogic`] and get wrapped in a [`Behavior`].

mod behavior;
mod table;

pub use behavior::{Behavior, BehaviorLogic};
pub use table::{TaskInfo, TaskTable};

use std::fmt;

use serde::Serialize;

use crate::activity::{Activity, ActivitySelector};
use crate::memory::MemoryStore;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum TaskStatus {
    /// Idle; may be started.
    #[default]
    Stopped,
    /// Started and being ticked every brain tick.
    Running,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("STOPPED"),
            Self::Running => f.write_str("RUNNING"),
        }
    }
}

/// Everything a task may read or change during one call.
pub struct TaskContext<'a, W, A> {
    /// The world, read-only.
    pub world: &'a W,
    /// The actor that owns the brain.
    pub actor: &'a mut A,
    /// The brain's memory.
    pub memory: &'a mut MemoryStore,
    /// The brain's activity state.
    pub activities: &'a mut ActivitySelector,
    /// Current game tick.
    pub now: u64,
}

impl<W, A> TaskContext<'_, W, A> {
    /// See [`ActivitySelector::set_active_activity_if_possible`].
    pub fn set_active_activity_if_possible(&mut self, activity: Activity) {
        self.activities.set_active_activity_if_possible(activity, self.memory);
    }

    /// See [`ActivitySelector::set_active_activity_to_first_valid`].
    pub fn set_active_activity_to_first_valid(&mut self, activities: &[Activity]) {
        self.activities.set_active_activity_to_first_valid(activities, self.memory);
    }

    /// See [`ActivitySelector::use_default_activity`].
    pub fn use_default_activity(&mut self) {
        self.activities.use_default_activity(self.memory);
    }

    /// Whether `activity` is active right now.
    #[must_use]
    pub fn is_active(&self, activity: Activity) -> bool {
        self.activities.is_active(activity)
    }
}

/// A schedulable unit of behavior.
pub trait Task<W, A>: Send {
    /// Name for logs and debug views.
    fn name(&self) -> &'static str;

    /// Current lifecycle state.
    fn status(&self) -> TaskStatus;

    /// Start the task if its preconditions hold. Only meaningful while
    /// STOPPED; returns whether the task is now RUNNING.
    fn try_start(&mut self, ctx: &mut TaskContext<'_, W, A>) -> bool;

    /// Either do one unit of work or stop. Only meaningful while RUNNING.
    fn tick_or_stop(&mut self, ctx: &mut TaskContext<'_, W, A>);

    /// Stop unconditionally.
    fn do_stop(&mut self, ctx: &mut TaskContext<'_, W, A>);
}
