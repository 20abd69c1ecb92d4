//! Perception for village actors.

use synapse_core::memory::{MemoryKey, MemoryStore};
use synapse_core::types::EntityId;
use synapse_core::Sensor;

use crate::slots::{HURT_BY, NEAREST_HOSTILE, VISIBLE_ENTITIES};
use crate::world::{SimActor, SimWorld};

/// Lists living actors in range and picks out the nearest hostile one.
#[derive(Debug, Clone)]
pub struct NearestEntitiesSensor {
    range: f32,
}

impl NearestEntitiesSensor {
    /// Sense actors within `range`.
    #[must_use]
    pub fn new(range: f32) -> Self {
        Self { range }
    }
}

impl Sensor<SimWorld, SimActor> for NearestEntitiesSensor {
    fn name(&self) -> &'static str {
        "nearest_entities"
    }

    fn requires(&self) -> Vec<MemoryKey> {
        vec![VISIBLE_ENTITIES.key(), NEAREST_HOSTILE.key()]
    }

    fn tick(&mut self, world: &SimWorld, actor: &SimActor, memory: &mut MemoryStore, _now: u64) {
        let nearby: Vec<_> = world
            .nearby(&actor.location, self.range)
            .into_iter()
            .filter(|view| view.id != actor.id)
            .collect();

        let hostile = nearby
            .iter()
            .find(|view| actor.faction.is_hostile_to(view.faction))
            .map(|view| view.id);
        memory.set_optional(&NEAREST_HOSTILE, hostile);

        let visible: Vec<EntityId> = nearby.into_iter().map(|view| view.id).collect();
        memory.set(&VISIBLE_ENTITIES, visible);
    }
}

/// Remembers the last attacker for a while after being hit.
#[derive(Debug, Clone)]
pub struct HurtBySensor {
    remember_ticks: u64,
}

impl HurtBySensor {
    /// Keep the attacker in memory for `remember_ticks` after the last hit.
    #[must_use]
    pub fn new(remember_ticks: u64) -> Self {
        Self { remember_ticks }
    }
}

impl Sensor<SimWorld, SimActor> for HurtBySensor {
    fn name(&self) -> &'static str {
        "hurt_by"
    }

    fn requires(&self) -> Vec<MemoryKey> {
        vec![HURT_BY.key()]
    }

    fn tick(&mut self, world: &SimWorld, actor: &SimActor, memory: &mut MemoryStore, now: u64) {
        if let Some((attacker, at)) = actor.last_hurt_by {
            if at.saturating_add(1) >= now {
                memory.set_with_expiry(&HURT_BY, attacker, self.remember_ticks);
            }
        }
        // Forget attackers that died or left.
        if let Some(&attacker) = memory.get(&HURT_BY) {
            if world.view(attacker).is_none() {
                memory.erase(&HURT_BY);
            }
        }
    }
}
