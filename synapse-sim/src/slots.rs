//! Memory slots used by the village brains.

use std::sync::LazyLock;

use synapse_core::memory::MemoryModuleType;
use synapse_core::types::{EntityId, Location};

/// Living actors in sensor range, nearest first.
pub static VISIBLE_ENTITIES: LazyLock<MemoryModuleType<Vec<EntityId>>> =
    LazyLock::new(|| MemoryModuleType::new("visible_entities"));

/// Closest visible actor of a hostile faction.
pub static NEAREST_HOSTILE: LazyLock<MemoryModuleType<EntityId>> =
    LazyLock::new(|| MemoryModuleType::new("nearest_hostile"));

/// Who we are fighting.
pub static ATTACK_TARGET: LazyLock<MemoryModuleType<EntityId>> =
    LazyLock::new(|| MemoryModuleType::new("attack_target"));

/// Who hit us recently.
pub static HURT_BY: LazyLock<MemoryModuleType<EntityId>> = LazyLock::new(|| MemoryModuleType::new("hurt_by"));

/// Where we are walking to.
pub static WALK_TARGET: LazyLock<MemoryModuleType<Location>> =
    LazyLock::new(|| MemoryModuleType::new("walk_target"));

/// Set after a melee hit; blocks the next one until it expires.
pub static ATTACK_COOLING_DOWN: LazyLock<MemoryModuleType<bool>> =
    LazyLock::new(|| MemoryModuleType::new("attack_cooling_down"));

/// Home position. Persisted across sessions.
pub static HOME: LazyLock<MemoryModuleType<Location>> = LazyLock::new(|| MemoryModuleType::new("home"));
