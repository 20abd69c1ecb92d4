//! Runtime metrics & tick budgets.
//!
//! Brains emit a `synapse::brain::tick` tracing span and structured events
//! for profiling. This module adds lightweight process-wide counters that can
//! be read at runtime or exported in Prometheus text format.
//!
//! Everything here is lock-free `AtomicU64`s bumped on the hot path, so many
//! brains ticking on a rayon pool report into the same counters. Brain and
//! simulation ticks are both checked against a [`TickBudget`]; overruns are
//! counted, and whole simulation ticks also land in a duration histogram.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Global Counters (lock-free)
// ---------------------------------------------------------------------------

/// Atomic counters for scheduler events.
pub struct BrainCounters {
    /// Completed brain ticks.
    pub brain_ticks: AtomicU64,
    /// Sensor refreshes performed.
    pub sensor_refreshes: AtomicU64,
    /// Tasks that went STOPPED → RUNNING.
    pub tasks_started: AtomicU64,
    /// Tasks that went RUNNING → STOPPED (natural or forced).
    pub tasks_stopped: AtomicU64,
    /// Memories erased by expiry.
    pub memories_expired: AtomicU64,
    /// Changes of the active non-core activity.
    pub activity_switches: AtomicU64,
    /// Schedule evaluations that passed the throttle.
    pub schedule_evaluations: AtomicU64,
    /// Snapshots written to a snapshot store.
    pub snapshots_saved: AtomicU64,
    /// Brain ticks over their [`TickBudget`].
    pub slow_brain_ticks: AtomicU64,
    /// Simulation ticks over their [`TickBudget`].
    pub slow_sim_ticks: AtomicU64,
    /// Durations of whole simulation ticks.
    pub sim_tick_us: TickHistogram,
}

impl BrainCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            brain_ticks: AtomicU64::new(0),
            sensor_refreshes: AtomicU64::new(0),
            tasks_started: AtomicU64::new(0),
            tasks_stopped: AtomicU64::new(0),
            memories_expired: AtomicU64::new(0),
            activity_switches: AtomicU64::new(0),
            schedule_evaluations: AtomicU64::new(0),
            snapshots_saved: AtomicU64::new(0),
            slow_brain_ticks: AtomicU64::new(0),
            slow_sim_ticks: AtomicU64::new(0),
            sim_tick_us: TickHistogram::new(),
        }
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            brain_ticks: self.brain_ticks.load(Ordering::Relaxed),
            sensor_refreshes: self.sensor_refreshes.load(Ordering::Relaxed),
            tasks_started: self.tasks_started.load(Ordering::Relaxed),
            tasks_stopped: self.tasks_stopped.load(Ordering::Relaxed),
            memories_expired: self.memories_expired.load(Ordering::Relaxed),
            activity_switches: self.activity_switches.load(Ordering::Relaxed),
            schedule_evaluations: self.schedule_evaluations.load(Ordering::Relaxed),
            snapshots_saved: self.snapshots_saved.load(Ordering::Relaxed),
            slow_brain_ticks: self.slow_brain_ticks.load(Ordering::Relaxed),
            slow_sim_ticks: self.slow_sim_ticks.load(Ordering::Relaxed),
            sim_tick_us: self.sim_tick_us.snapshot(),
        }
    }
}

impl Default for BrainCounters {
    fn default() -> Self {
        Self::new()
    }
}

static COUNTERS: BrainCounters = BrainCounters::new();

/// The process-wide counters every brain reports into.
#[must_use]
pub fn counters() -> &'static BrainCounters {
    &COUNTERS
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Completed brain ticks.
    pub brain_ticks: u64,
    /// Sensor refreshes performed.
    pub sensor_refreshes: u64,
    /// Tasks started.
    pub tasks_started: u64,
    /// Tasks stopped.
    pub tasks_stopped: u64,
    /// Memories expired.
    pub memories_expired: u64,
    /// Activity switches.
    pub activity_switches: u64,
    /// Schedule evaluations.
    pub schedule_evaluations: u64,
    /// Snapshots saved.
    pub snapshots_saved: u64,
    /// Brain ticks over budget.
    pub slow_brain_ticks: u64,
    /// Simulation ticks over budget.
    pub slow_sim_ticks: u64,
    /// Simulation tick durations.
    pub sim_tick_us: HistogramSnapshot,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows = [
            ("synapse_brain_ticks_total", "Completed brain ticks", self.brain_ticks),
            ("synapse_sensor_refreshes_total", "Sensor refreshes performed", self.sensor_refreshes),
            ("synapse_tasks_started_total", "Tasks started", self.tasks_started),
            ("synapse_tasks_stopped_total", "Tasks stopped", self.tasks_stopped),
            ("synapse_memories_expired_total", "Memories erased by expiry", self.memories_expired),
            ("synapse_activity_switches_total", "Active activity changes", self.activity_switches),
            ("synapse_schedule_evaluations_total", "Schedule evaluations", self.schedule_evaluations),
            ("synapse_snapshots_saved_total", "Brain snapshots saved", self.snapshots_saved),
            ("synapse_slow_brain_ticks_total", "Brain ticks over budget", self.slow_brain_ticks),
            ("synapse_slow_sim_ticks_total", "Simulation ticks over budget", self.slow_sim_ticks),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"));
        }
        self.sim_tick_us
            .write_prometheus("synapse_sim_tick_duration_us", "Simulation tick wall time (µs)", &mut out);
        out
    }
}

// ---------------------------------------------------------------------------
// Tick budgets
// ---------------------------------------------------------------------------

/// Wall-time allowance for one tick, in microseconds. Zero disables it.
///
/// Brains check every tick against `telemetry.log_slow_ticks_us`; the
/// simulation driver checks whole ticks against `telemetry.tick_budget_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickBudget {
    budget_us: u64,
}

impl TickBudget {
    /// A budget of `budget_us` microseconds.
    #[must_use]
    pub const fn from_micros(budget_us: u64) -> Self {
        Self { budget_us }
    }

    /// A budget given in (fractional) milliseconds, as in the telemetry config.
    #[must_use]
    pub fn from_millis(budget_ms: f64) -> Self {
        let budget_us = Duration::try_from_secs_f64(budget_ms / 1000.0)
            .map_or(0, |d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX));
        Self { budget_us }
    }

    /// The allowance in microseconds.
    #[must_use]
    pub fn as_micros(self) -> u64 {
        self.budget_us
    }

    /// Whether a tick of `elapsed_us` overran the budget.
    #[must_use]
    pub fn is_exceeded(self, elapsed_us: u64) -> bool {
        self.budget_us > 0 && elapsed_us > self.budget_us
    }
}

/// Microseconds elapsed since `begin`, saturating.
#[must_use]
pub fn elapsed_us(begin: Instant) -> u64 {
    u64::try_from(begin.elapsed().as_micros()).unwrap_or(u64::MAX)
}

/// Upper bounds (µs) of the simulation tick histogram buckets.
pub const SIM_TICK_BUCKETS_US: [u64; 7] = [100, 250, 500, 1_000, 2_000, 5_000, 10_000];

/// Lock-free histogram of simulation tick durations.
pub struct TickHistogram {
    /// One slot per bound plus the overflow bucket.
    buckets: [AtomicU64; SIM_TICK_BUCKETS_US.len() + 1],
    sum_us: AtomicU64,
    count: AtomicU64,
}

impl TickHistogram {
    /// An empty histogram.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buckets: [const { AtomicU64::new(0) }; SIM_TICK_BUCKETS_US.len() + 1],
            sum_us: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record one tick.
    pub fn observe(&self, elapsed_us: u64) {
        let idx = SIM_TICK_BUCKETS_US.partition_point(|&bound| bound < elapsed_us);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_us.fetch_add(elapsed_us, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative bucket counts, Prometheus style.
    #[must_use]
    pub fn snapshot(&self) -> HistogramSnapshot {
        let mut running = 0;
        let cumulative = self
            .buckets
            .iter()
            .map(|bucket| {
                running += bucket.load(Ordering::Relaxed);
                running
            })
            .collect();
        HistogramSnapshot {
            cumulative,
            sum_us: self.sum_us.load(Ordering::Relaxed),
            count: self.count.load(Ordering::Relaxed),
        }
    }
}

impl Default for TickHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Histogram values at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistogramSnapshot {
    /// Cumulative counts per bound of [`SIM_TICK_BUCKETS_US`], then `+Inf`.
    pub cumulative: Vec<u64>,
    /// Sum of all observations (µs).
    pub sum_us: u64,
    /// Number of observations.
    pub count: u64,
}

impl HistogramSnapshot {
    fn write_prometheus(&self, name: &str, help: &str, out: &mut String) {
        out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} histogram\n"));
        let bounds = SIM_TICK_BUCKETS_US.iter().map(u64::to_string).chain(["+Inf".to_string()]);
        for (le, count) in bounds.zip(&self.cumulative) {
            out.push_str(&format!("{name}_bucket{{le=\"{le}\"}} {count}\n"));
        }
        out.push_str(&format!("{name}_sum {}\n{name}_count {}\n", self.sum_us, self.count));
    }
}
