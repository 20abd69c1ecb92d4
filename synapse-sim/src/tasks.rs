//! Behaviors for village actors.
//!
//! Each behavior has a `behavior(..)` constructor that wraps it in a
//! [`Behavior`] with its memory entry conditions already attached.
//!
//! | Behavior                    | Activity | Kind     |
//! |-----------------------------|----------|----------|
//! | `MoveToWalkTarget`          | core     | running  |
//! | `StartAttacking`            | core     | one-shot |
//! | `ReactToThreat`             | core     | one-shot |
//! | `Wander`                    | idle/work| one-shot |
//! | `GoHome`                    | rest     | one-shot |
//! | `StopAttackingWhenInvalid`  | fight    | one-shot |
//! | `MeleeAttack`               | fight    | running  |
//! | `FleeFromAttacker`          | panic    | running  |

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use synapse_core::task::{Behavior, BehaviorLogic, TaskContext};
use synapse_core::types::{EntityId, Location};

use crate::activities::{FIGHT, PANIC};
use crate::slots::{ATTACK_COOLING_DOWN, ATTACK_TARGET, HOME, HURT_BY, NEAREST_HOSTILE, WALK_TARGET};
use crate::world::{SimActor, SimWorld};

type Ctx<'a> = TaskContext<'a, SimWorld, SimActor>;

/// How long a chosen wander target stays valid.
const WALK_TARGET_TTL: u64 = 200;

fn home_of(ctx: &Ctx<'_>) -> Location {
    ctx.memory.get(&HOME).copied().unwrap_or(ctx.actor.home)
}

/// The attacker if known, else the nearest hostile.
fn threat_of(ctx: &Ctx<'_>) -> Option<EntityId> {
    ctx.memory
        .get(&HURT_BY)
        .or_else(|| ctx.memory.get(&NEAREST_HOSTILE))
        .copied()
}

fn threat_location(ctx: &Ctx<'_>) -> Option<Location> {
    threat_of(ctx).and_then(|id| ctx.world.view(id)).map(|view| view.location)
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// Walks towards the walk target; erases it on arrival.
#[derive(Debug, Clone)]
pub struct MoveToWalkTarget {
    arrive_distance: f32,
}

impl MoveToWalkTarget {
    /// Runs while a walk target is set.
    #[must_use]
    pub fn behavior(arrive_distance: f32) -> Behavior<Self> {
        Behavior::new(Self { arrive_distance }).requires_value(&WALK_TARGET)
    }

    fn remaining(&self, ctx: &Ctx<'_>) -> Option<f32> {
        ctx.memory
            .get(&WALK_TARGET)
            .map(|target| ctx.actor.location.distance(target))
    }
}

impl BehaviorLogic<SimWorld, SimActor> for MoveToWalkTarget {
    fn name(&self) -> &'static str {
        "move_to_walk_target"
    }

    fn can_continue(&mut self, ctx: &Ctx<'_>) -> bool {
        self.remaining(ctx).is_some_and(|d| d > self.arrive_distance)
    }

    fn tick(&mut self, ctx: &mut Ctx<'_>) {
        if let Some(target) = ctx.memory.get(&WALK_TARGET).copied() {
            ctx.actor.step_towards(&target);
        }
    }

    fn stop(&mut self, ctx: &mut Ctx<'_>) {
        if self.remaining(ctx).is_some_and(|d| d <= self.arrive_distance) {
            ctx.memory.erase(&WALK_TARGET);
        }
    }
}

/// Now and then picks a random spot around home to walk to.
#[derive(Debug, Clone)]
pub struct Wander {
    radius: f32,
    chance: f64,
    rng: StdRng,
}

impl Wander {
    /// Each tick without a walk target, start with probability `chance`.
    #[must_use]
    pub fn behavior(radius: f32, chance: f64, seed: u64) -> Behavior<Self> {
        Behavior::new(Self {
            radius: radius.abs(),
            chance: chance.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        })
        .requires_absent(&WALK_TARGET)
    }
}

impl BehaviorLogic<SimWorld, SimActor> for Wander {
    fn name(&self) -> &'static str {
        "wander"
    }

    fn can_start(&mut self, _ctx: &Ctx<'_>) -> bool {
        self.rng.gen_bool(self.chance)
    }

    fn start(&mut self, ctx: &mut Ctx<'_>) {
        let home = home_of(ctx);
        let target = Location::new(
            home.x + self.rng.gen_range(-self.radius..=self.radius),
            home.y,
            home.z + self.rng.gen_range(-self.radius..=self.radius),
        );
        ctx.memory.set_with_expiry(&WALK_TARGET, target, WALK_TARGET_TTL);
    }
}

/// Heads home when away from it.
#[derive(Debug, Clone)]
pub struct GoHome {
    arrive_distance: f32,
}

impl GoHome {
    /// Starts when further than `arrive_distance` from home.
    #[must_use]
    pub fn behavior(arrive_distance: f32) -> Behavior<Self> {
        Behavior::new(Self { arrive_distance }).requires_absent(&WALK_TARGET)
    }
}

impl BehaviorLogic<SimWorld, SimActor> for GoHome {
    fn name(&self) -> &'static str {
        "go_home"
    }

    fn can_start(&mut self, ctx: &Ctx<'_>) -> bool {
        ctx.actor.location.distance(&home_of(ctx)) > self.arrive_distance
    }

    fn start(&mut self, ctx: &mut Ctx<'_>) {
        let home = home_of(ctx);
        ctx.memory.set(&WALK_TARGET, home);
    }
}

// ---------------------------------------------------------------------------
// Threat response
// ---------------------------------------------------------------------------

/// Picks the attacker (or the nearest hostile) as attack target and switches
/// to FIGHT.
#[derive(Debug, Clone, Default)]
pub struct StartAttacking;

impl StartAttacking {
    /// Starts while no attack target is set.
    #[must_use]
    pub fn behavior() -> Behavior<Self> {
        Behavior::new(Self).requires_absent(&ATTACK_TARGET)
    }
}

impl BehaviorLogic<SimWorld, SimActor> for StartAttacking {
    fn name(&self) -> &'static str {
        "start_attacking"
    }

    fn can_start(&mut self, ctx: &Ctx<'_>) -> bool {
        threat_location(ctx).is_some()
    }

    fn start(&mut self, ctx: &mut Ctx<'_>) {
        let Some(target) = threat_of(ctx) else {
            return;
        };
        ctx.memory.set(&ATTACK_TARGET, target);
        ctx.set_active_activity_if_possible(*FIGHT);
        debug!(actor = %ctx.actor.name, %target, "Engaging");
    }
}

/// Non-combatants: switch to PANIC when threatened.
#[derive(Debug, Clone, Default)]
pub struct ReactToThreat;

impl ReactToThreat {
    /// One-shot, no entry conditions.
    #[must_use]
    pub fn behavior() -> Behavior<Self> {
        Behavior::new(Self)
    }
}

impl BehaviorLogic<SimWorld, SimActor> for ReactToThreat {
    fn name(&self) -> &'static str {
        "react_to_threat"
    }

    fn can_start(&mut self, ctx: &Ctx<'_>) -> bool {
        !ctx.is_active(*PANIC) && threat_location(ctx).is_some()
    }

    fn start(&mut self, ctx: &mut Ctx<'_>) {
        ctx.memory.erase(&WALK_TARGET);
        ctx.set_active_activity_if_possible(*PANIC);
        debug!(actor = %ctx.actor.name, "Panicking");
    }
}

/// Runs directly away from the threat until it is gone, then calms down.
#[derive(Debug, Clone)]
pub struct FleeFromAttacker {
    speed_multiplier: f32,
}

impl FleeFromAttacker {
    /// Flee at `speed_multiplier` times walking speed.
    #[must_use]
    pub fn behavior(speed_multiplier: f32) -> Behavior<Self> {
        Behavior::new(Self { speed_multiplier })
    }
}

impl BehaviorLogic<SimWorld, SimActor> for FleeFromAttacker {
    fn name(&self) -> &'static str {
        "flee_from_attacker"
    }

    fn can_start(&mut self, ctx: &Ctx<'_>) -> bool {
        threat_location(ctx).is_some()
    }

    fn can_continue(&mut self, ctx: &Ctx<'_>) -> bool {
        threat_location(ctx).is_some()
    }

    fn tick(&mut self, ctx: &mut Ctx<'_>) {
        let Some(threat) = threat_location(ctx) else {
            return;
        };
        let here = ctx.actor.location;
        let away = Location::new(
            here.x + (here.x - threat.x) * 10.0,
            here.y,
            here.z + (here.z - threat.z) * 10.0,
        );
        ctx.actor.location = here.step_towards(&away, ctx.actor.speed * self.speed_multiplier);
    }

    fn stop(&mut self, ctx: &mut Ctx<'_>) {
        ctx.use_default_activity();
    }
}

// ---------------------------------------------------------------------------
// Fighting
// ---------------------------------------------------------------------------

/// Leaves FIGHT when the target is gone, dead or out of range.
#[derive(Debug, Clone)]
pub struct StopAttackingWhenInvalid {
    give_up_distance: f32,
}

impl StopAttackingWhenInvalid {
    /// Give up on targets further than `give_up_distance`.
    #[must_use]
    pub fn behavior(give_up_distance: f32) -> Behavior<Self> {
        Behavior::new(Self { give_up_distance })
    }
}

impl BehaviorLogic<SimWorld, SimActor> for StopAttackingWhenInvalid {
    fn name(&self) -> &'static str {
        "stop_attacking_when_invalid"
    }

    fn can_start(&mut self, ctx: &Ctx<'_>) -> bool {
        let Some(&target) = ctx.memory.get(&ATTACK_TARGET) else {
            return true;
        };
        ctx.world
            .view(target)
            .is_none_or(|view| view.location.distance(&ctx.actor.location) > self.give_up_distance)
    }

    fn start(&mut self, ctx: &mut Ctx<'_>) {
        ctx.memory.erase(&ATTACK_TARGET);
        ctx.use_default_activity();
        debug!(actor = %ctx.actor.name, "Disengaging");
    }
}

/// Closes in on the attack target and hits it whenever the cooldown allows.
#[derive(Debug, Clone)]
pub struct MeleeAttack {
    reach: f32,
    cooldown_ticks: u64,
}

impl MeleeAttack {
    /// Hit from within `reach`, at most once per `cooldown_ticks`.
    #[must_use]
    pub fn behavior(reach: f32, cooldown_ticks: u64) -> Behavior<Self> {
        Behavior::new(Self { reach, cooldown_ticks }).requires_value(&ATTACK_TARGET)
    }
}

impl BehaviorLogic<SimWorld, SimActor> for MeleeAttack {
    fn name(&self) -> &'static str {
        "melee_attack"
    }

    fn can_continue(&mut self, ctx: &Ctx<'_>) -> bool {
        ctx.memory
            .get(&ATTACK_TARGET)
            .is_some_and(|&target| ctx.world.view(target).is_some())
    }

    fn tick(&mut self, ctx: &mut Ctx<'_>) {
        let Some(&target) = ctx.memory.get(&ATTACK_TARGET) else {
            return;
        };
        let Some(view) = ctx.world.view(target) else {
            return;
        };
        if ctx.actor.location.distance(&view.location) > self.reach {
            ctx.actor.step_towards(&view.location);
            return;
        }
        if !ctx.memory.has_value(&ATTACK_COOLING_DOWN) {
            ctx.actor.queue_attack(target);
            ctx.memory
                .set_with_expiry(&ATTACK_COOLING_DOWN, true, self.cooldown_ticks);
        }
    }
}
