//! The simulated world and its actors.
//!
//! Brains only ever see the world read-only. Everything an actor does to
//! another actor is queued as an [`Action`] on the acting actor and resolved
//! after every brain has ticked (see [`crate::systems::apply_actions`]).

use serde::{Deserialize, Serialize};

use synapse_core::types::{EntityId, GameClock, Location};

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// Which side an actor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Villagers and guards.
    Village,
    /// Raiders from outside.
    Raider,
}

impl Faction {
    /// Whether members of `self` attack members of `other` on sight.
    #[must_use]
    pub fn is_hostile_to(self, other: Self) -> bool {
        self != other
    }
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

/// A cross-actor effect, resolved after all brains have ticked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Deal damage to another actor.
    Attack {
        /// Victim.
        target: EntityId,
        /// Health removed.
        damage: f32,
    },
}

/// Mutable per-actor state owned by the simulation.
#[derive(Debug, Clone)]
pub struct SimActor {
    /// Identity.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Current position.
    pub location: Location,
    /// Remaining health; dead at zero.
    pub health: f32,
    /// Side.
    pub faction: Faction,
    /// Where the actor lives.
    pub home: Location,
    /// Distance covered per tick when walking.
    pub speed: f32,
    /// Damage per melee hit.
    pub attack_damage: f32,
    /// Last attacker and the tick of the hit.
    pub last_hurt_by: Option<(EntityId, u64)>,
    /// Effects queued this tick.
    pub pending: Vec<Action>,
}

impl SimActor {
    /// A healthy actor standing at its home.
    #[must_use]
    pub fn new(name: impl Into<String>, faction: Faction, home: Location) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            location: home,
            health: 20.0,
            faction,
            home,
            speed: 0.5,
            attack_damage: 3.0,
            last_hurt_by: None,
            pending: Vec::new(),
        }
    }

    /// Whether the actor still has health.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Walk up to `speed` towards `target`.
    pub fn step_towards(&mut self, target: &Location) {
        self.location = self.location.step_towards(target, self.speed);
    }

    /// Queue an attack on `target`.
    pub fn queue_attack(&mut self, target: EntityId) {
        self.pending.push(Action::Attack {
            target,
            damage: self.attack_damage,
        });
    }
}

/// What other actors can observe about an actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorView {
    /// Identity.
    pub id: EntityId,
    /// Position at the start of the tick.
    pub location: Location,
    /// Side.
    pub faction: Faction,
    /// Health at the start of the tick.
    pub health: f32,
}

impl From<&SimActor> for ActorView {
    fn from(actor: &SimActor) -> Self {
        Self {
            id: actor.id,
            location: actor.location,
            faction: actor.faction,
            health: actor.health,
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Clock plus a start-of-tick view of every living actor.
#[derive(Debug, Clone)]
pub struct SimWorld {
    time: u64,
    ticks_per_day: u64,
    views: Vec<ActorView>,
}

impl SimWorld {
    /// A world at tick 0.
    #[must_use]
    pub fn new(ticks_per_day: u64) -> Self {
        Self {
            time: 0,
            ticks_per_day: ticks_per_day.max(1),
            views: Vec::new(),
        }
    }

    /// Start the clock at `time`.
    #[must_use]
    pub fn starting_at(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    /// Move the clock forward by one tick.
    pub fn advance(&mut self) {
        self.time += 1;
    }

    /// Rebuild the actor views from the living actors.
    pub fn refresh_views<'a>(&mut self, actors: impl IntoIterator<Item = &'a SimActor>) {
        self.views.clear();
        self.views
            .extend(actors.into_iter().filter(|a| a.is_alive()).map(ActorView::from));
    }

    /// The view of a living actor.
    #[must_use]
    pub fn view(&self, id: EntityId) -> Option<&ActorView> {
        self.views.iter().find(|v| v.id == id)
    }

    /// Every living actor.
    #[must_use]
    pub fn views(&self) -> &[ActorView] {
        &self.views
    }

    /// Living actors within `radius` of `center`, nearest first.
    #[must_use]
    pub fn nearby(&self, center: &Location, radius: f32) -> Vec<&ActorView> {
        let radius_sq = radius * radius;
        let mut found: Vec<&ActorView> = self
            .views
            .iter()
            .filter(|v| v.location.distance_squared(center) <= radius_sq)
            .collect();
        found.sort_by(|a, b| {
            a.location
                .distance_squared(center)
                .total_cmp(&b.location.distance_squared(center))
        });
        found
    }
}

impl GameClock for SimWorld {
    fn game_time(&self) -> u64 {
        self.time
    }

    fn day_time(&self) -> u64 {
        self.time % self.ticks_per_day
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_time_wraps() {
        let mut world = SimWorld::new(100).starting_at(99);
        assert_eq!(world.day_time(), 99);
        world.advance();
        assert_eq!(world.game_time(), 100);
        assert_eq!(world.day_time(), 0);
    }

    #[test]
    fn nearby_is_sorted_and_skips_dead() {
        let a = SimActor::new("a", Faction::Village, Location::new(5.0, 0.0, 0.0));
        let b = SimActor::new("b", Faction::Raider, Location::new(1.0, 0.0, 0.0));
        let mut dead = SimActor::new("dead", Faction::Raider, Location::new(0.5, 0.0, 0.0));
        dead.health = 0.0;

        let mut world = SimWorld::new(24_000);
        world.refresh_views([&a, &b, &dead]);
        let ids: Vec<_> = world.nearby(&Location::default(), 10.0).iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert!(world.view(dead.id).is_none());
    }

    #[test]
    fn factions_are_hostile_across_sides_only() {
        assert!(Faction::Village.is_hostile_to(Faction::Raider));
        assert!(!Faction::Raider.is_hostile_to(Faction::Raider));
    }
}
