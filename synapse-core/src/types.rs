//! Core type definitions shared by brains and their hosts.
//!
//! The brain treats the world as opaque apart from [`GameClock`]; the
//! identity and spatial types here exist so that hosts and memory slots can
//! agree on a common vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::memory::MemoryValue;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for any entity (NPC, player, creature) in the game world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MemoryValue for EntityId {}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A 3D position in the game world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Location {
    /// Create a location from its coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Squared distance to `other` (cheap range checks).
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Move at most `step` units towards `target`, stopping on it.
    #[must_use]
    pub fn step_towards(&self, target: &Self, step: f32) -> Self {
        let dist = self.distance(target);
        if dist <= step || dist < f32::EPSILON {
            return *target;
        }
        let t = step / dist;
        Self {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
            z: self.z + (target.z - self.z) * t,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

impl MemoryValue for Location {}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// The one thing a brain needs from the world it lives in: a clock.
///
/// `game_time` is the monotonic tick counter; `day_time` is the time of day
/// used by schedules (defaults to the game time, wrapped by the schedule).
pub trait GameClock {
    /// Monotonic game tick.
    fn game_time(&self) -> u64;

    /// Time of day in ticks.
    fn day_time(&self) -> u64 {
        self.game_time()
    }
}
