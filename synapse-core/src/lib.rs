//! # Synapse Core Library
//!
//! Game-agnostic decision making for simulated actors.
//!
//! Every actor gets a [`Brain`] that combines:
//!
//! - **Memory**: typed slots with optional expiry ([`MemoryStore`])
//! - **Sensors**: periodic world → memory refreshes ([`Sensor`])
//! - **Tasks**: prioritized behaviors with a STOPPED/RUNNING lifecycle ([`Task`])
//! - **Activities**: named behavior contexts that gate which tasks may start
//!   ([`Activity`]), optionally driven by a daily [`Schedule`]
//!
//! Brains are assembled declaratively with a [`BrainProfile`] and ticked once
//! per game tick by the host. The brain is generic over the host's world and
//! actor types; the only thing it needs from the world is a [`GameClock`].
//!
//! ## Performance Contract
//!
//! A brain tick does no I/O and no allocation proportional to world size:
//! - Memory aging: one pass over registered slots
//! - Task scheduling: one pass over the task table per phase
//! - Slow ticks are reported through `tracing` (see [`config::TelemetryConfig`])

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod activity;
pub mod brain;
pub mod config;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod persistence;
pub mod schedule;
pub mod sensor;
pub mod task;
pub mod types;

pub use activity::{Activity, ActivityCleanupRule, ActivityRequirement};
pub use brain::{Brain, BrainDebugInfo, BrainProfile};
pub use config::BrainConfig;
pub use error::BrainError;
pub use memory::{Memory, MemoryKey, MemoryModuleType, MemoryStatus, MemoryStore, MemoryValue};
pub use persistence::{MemorySnapshot, SnapshotStore};
pub use schedule::Schedule;
pub use sensor::Sensor;
pub use task::{Behavior, BehaviorLogic, Task, TaskContext, TaskStatus};
pub use types::*;
