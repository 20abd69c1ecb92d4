//! # synapse-sim: Village Simulation Host
//!
//! Drives `synapse-core` brains from a small game loop: a 2D village with
//! villagers, guards and raiders.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               Simulation                 │
//! │  ┌────────────┐   ┌──────────────────┐   │
//! │  │  SimWorld  │◀──│ systems (driver) │   │
//! │  └─────┬──────┘   └────────┬─────────┘   │
//! │        │ read-only         │ tick        │
//! │        ▼                   ▼             │
//! │  ┌─────────────────────────────────┐     │
//! │  │  Brain<SimWorld, SimActor> × N  │     │
//! │  │  sensors · tasks · profiles     │     │
//! │  └─────────────────────────────────┘     │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `world`: clock, actors, factions and queued actions
//! - `slots` / `activities`: memory slot and activity tokens
//! - `sensors`: nearest-entity and hurt-by perception
//! - `tasks`: movement, threat and combat behaviors
//! - `profiles`: villager and guard brain profiles
//! - `systems`: the per-tick driver with panic isolation

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod activities;
pub mod profiles;
pub mod sensors;
pub mod slots;
pub mod systems;
pub mod tasks;
pub mod world;

pub use systems::{Agent, Simulation, TickReport};
pub use world::{Faction, SimActor, SimWorld};
