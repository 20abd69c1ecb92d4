//! Time-of-day → activity lookup.
//!
//! A schedule is a sorted list of keyframes: from each threshold until the
//! next one, the keyframe's activity is the scheduled one. Times before the
//! first threshold belong to the last keyframe of the previous day.

use std::collections::BTreeMap;

use crate::activity::Activity;

/// Day length used when neither the schedule nor the configuration sets one.
pub const DEFAULT_TICKS_PER_DAY: u64 = 24_000;

/// An immutable daily schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    keyframes: Vec<(u64, Activity)>,
    day_length: Option<u64>,
}

impl Schedule {
    /// A schedule with no keyframes; lookups always return `None`.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a schedule.
    #[must_use]
    pub fn builder() -> ScheduleBuilder {
        ScheduleBuilder::default()
    }

    /// The activity scheduled at `time`.
    #[must_use]
    pub fn activity_at(&self, time: u64) -> Option<Activity> {
        let (_, last) = self.keyframes.last()?;
        let time = time % self.day_length();
        let idx = self.keyframes.partition_point(|(threshold, _)| *threshold <= time);
        if idx == 0 {
            Some(*last)
        } else {
            Some(self.keyframes[idx - 1].1)
        }
    }

    /// Whether the schedule has no keyframes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Length of one day in ticks.
    #[must_use]
    pub fn day_length(&self) -> u64 {
        self.day_length.unwrap_or(DEFAULT_TICKS_PER_DAY).max(1)
    }

    /// The `(threshold, activity)` keyframes in ascending order.
    #[must_use]
    pub fn keyframes(&self) -> &[(u64, Activity)] {
        &self.keyframes
    }

    /// Fill in the day length if the builder did not set one.
    pub(crate) fn with_default_day_length(mut self, ticks: u64) -> Self {
        self.day_length.get_or_insert(ticks);
        self
    }
}

/// Builder for [`Schedule`].
#[derive(Debug, Clone, Default)]
pub struct ScheduleBuilder {
    keyframes: BTreeMap<u64, Activity>,
    day_length: Option<u64>,
}

impl ScheduleBuilder {
    /// Switch to `activity` at `threshold` ticks into the day. A second
    /// keyframe at the same threshold replaces the first.
    #[must_use]
    pub fn change_activity_at(mut self, threshold: u64, activity: Activity) -> Self {
        self.keyframes.insert(threshold, activity);
        self
    }

    /// Override the day length.
    #[must_use]
    pub fn day_length(mut self, ticks: u64) -> Self {
        self.day_length = Some(ticks);
        self
    }

    /// Finish the schedule.
    #[must_use]
    pub fn build(self) -> Schedule {
        Schedule {
            keyframes: self.keyframes.into_iter().collect(),
            day_length: self.day_length,
        }
    }
}
