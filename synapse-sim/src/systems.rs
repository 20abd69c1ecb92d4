//! The per-tick driver for the village simulation.
//!
//! ## Tick order
//!
//! | Step               | What                                          |
//! |--------------------|-----------------------------------------------|
//! | Refresh views      | snapshot living actors into the world         |
//! | Schedule           | throttled schedule update per brain           |
//! | Brains             | one `Brain::tick` per living actor            |
//! | Apply actions      | resolve queued attacks                        |
//! | Advance clock      | `game_time += 1`                              |
//!
//! A brain that panics is caught, its actor quarantined and logged, and the
//! rest of the village keeps ticking.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use synapse_core::config::BrainConfig;
use synapse_core::error::Result;
use synapse_core::metrics::{self, TickBudget};
use synapse_core::types::{EntityId, GameClock};
use synapse_core::{Brain, SnapshotStore};

use crate::profiles::SimProfile;
use crate::slots::HOME;
use crate::world::{Action, Faction, SimActor, SimWorld};

/// An actor and the brain that drives it.
pub struct Agent {
    /// The actor.
    pub actor: SimActor,
    /// Its brain.
    pub brain: Brain<SimWorld, SimActor>,
    /// Set after the brain panicked; quarantined agents are never ticked
    /// again.
    pub quarantined: bool,
}

impl Agent {
    fn is_active(&self) -> bool {
        !self.quarantined && self.actor.is_alive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Tick one agent, catching a panicking brain. Returns `true` if the agent
/// was quarantined by this call.
fn tick_agent(world: &SimWorld, agent: &mut Agent) -> bool {
    if !agent.is_active() {
        return false;
    }
    let Agent { actor, brain, .. } = &mut *agent;
    match panic::catch_unwind(AssertUnwindSafe(|| brain.tick(world, actor))) {
        Ok(()) => false,
        Err(payload) => {
            agent.quarantined = true;
            warn!(
                actor = %agent.actor.id,
                name = %agent.actor.name,
                reason = panic_message(payload.as_ref()),
                "Brain panicked, actor quarantined"
            );
            true
        }
    }
}

/// Tick every active agent in order. Returns the number quarantined.
pub fn tick_actors(world: &SimWorld, agents: &mut [Agent]) -> usize {
    agents
        .iter_mut()
        .map(|agent| tick_agent(world, agent))
        .filter(|&quarantined| quarantined)
        .count()
}

/// Tick every active agent on the rayon pool, one brain per work item.
/// Returns the number quarantined.
pub fn tick_actors_parallel(world: &SimWorld, agents: &mut [Agent]) -> usize {
    agents
        .par_iter_mut()
        .map(|agent| tick_agent(world, agent))
        .filter(|&quarantined| quarantined)
        .count()
}

/// Give every active brain a chance to follow its schedule.
pub fn update_schedules(world: &SimWorld, agents: &mut [Agent]) {
    let (day_time, game_time) = (world.day_time(), world.game_time());
    for agent in agents.iter_mut().filter(|agent| agent.is_active()) {
        agent.brain.update_activity_from_schedule(day_time, game_time);
    }
}

/// Resolve every queued action. Returns the number of actors killed.
pub fn apply_actions(agents: &mut [Agent], now: u64) -> usize {
    let queued: Vec<(EntityId, Action)> = agents
        .iter_mut()
        .flat_map(|agent| {
            let from = agent.actor.id;
            agent.actor.pending.drain(..).map(move |action| (from, action))
        })
        .collect();

    let mut killed = 0;
    for (attacker, action) in queued {
        match action {
            Action::Attack { target, damage } => {
                let Some(victim) = agents.iter_mut().find(|a| a.actor.id == target) else {
                    continue;
                };
                if !victim.actor.is_alive() {
                    continue;
                }
                victim.actor.health -= damage;
                victim.actor.last_hurt_by = Some((attacker, now));
                if !victim.actor.is_alive() {
                    killed += 1;
                    info!(victim = %victim.actor.name, %attacker, now, "Actor killed");
                }
            }
        }
    }
    killed
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Summary of one simulation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Agents quarantined during the tick.
    pub quarantined: usize,
    /// Actors killed during the tick.
    pub killed: usize,
    /// Ticks that overran `telemetry.tick_budget_ms`.
    pub over_budget: usize,
}

/// World clock, agents and tick-budget bookkeeping.
pub struct Simulation {
    world: SimWorld,
    agents: Vec<Agent>,
    config: BrainConfig,
    budget: TickBudget,
    parallel: bool,
}

impl Simulation {
    /// An empty simulation using `config`.
    #[must_use]
    pub fn new(config: BrainConfig) -> Self {
        Self {
            world: SimWorld::new(config.scheduler.ticks_per_day),
            agents: Vec::new(),
            budget: TickBudget::from_millis(config.telemetry.tick_budget_ms),
            config,
            parallel: false,
        }
    }

    /// Tick brains on the rayon pool.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Start the clock at `time`.
    #[must_use]
    pub fn starting_at(mut self, time: u64) -> Self {
        self.world = self.world.starting_at(time);
        self
    }

    /// The configuration brains are built with.
    #[must_use]
    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    /// Add an actor driven by a brain built from `profile`.
    ///
    /// # Errors
    ///
    /// Propagates profile build errors.
    pub fn spawn(&mut self, actor: SimActor, profile: SimProfile) -> Result<EntityId> {
        let mut brain = profile.build()?;
        brain.set_memory(&HOME, actor.home);
        let id = actor.id;
        debug!(actor = %actor.name, faction = ?actor.faction, "Spawned");
        self.agents.push(Agent {
            actor,
            brain,
            quarantined: false,
        });
        Ok(id)
    }

    /// Run one tick.
    pub fn step(&mut self) -> TickReport {
        let now = self.world.game_time();
        let _span = info_span!("synapse::sim::tick", now).entered();
        let begin = Instant::now();

        self.world.refresh_views(self.agents.iter().map(|a| &a.actor));
        let quarantined = if !self.config.general.enabled {
            0
        } else if self.parallel {
            update_schedules(&self.world, &mut self.agents);
            tick_actors_parallel(&self.world, &mut self.agents)
        } else {
            update_schedules(&self.world, &mut self.agents);
            tick_actors(&self.world, &mut self.agents)
        };
        let killed = apply_actions(&mut self.agents, now);

        let elapsed_us = metrics::elapsed_us(begin);
        let counters = metrics::counters();
        counters.sim_tick_us.observe(elapsed_us);
        let over_budget = self.budget.is_exceeded(elapsed_us);
        if over_budget {
            counters.slow_sim_ticks.fetch_add(1, Ordering::Relaxed);
            debug!(now, elapsed_us, budget_us = self.budget.as_micros(), "Simulation tick over budget");
        }

        self.world.advance();
        TickReport {
            quarantined,
            killed,
            over_budget: usize::from(over_budget),
        }
    }

    /// Run `ticks` ticks and sum their reports.
    pub fn run(&mut self, ticks: u64) -> TickReport {
        let mut total = TickReport::default();
        for _ in 0..ticks {
            let report = self.step();
            total.quarantined += report.quarantined;
            total.killed += report.killed;
            total.over_budget += report.over_budget;
        }
        total
    }

    /// The world.
    #[must_use]
    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    /// All agents, dead and quarantined included.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Look up an agent.
    #[must_use]
    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.actor.id == id)
    }

    /// Look up an agent mutably.
    pub fn agent_mut(&mut self, id: EntityId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.actor.id == id)
    }

    /// Living, non-quarantined actors of `faction`.
    #[must_use]
    pub fn living(&self, faction: Faction) -> usize {
        self.agents
            .iter()
            .filter(|a| a.is_active() && a.actor.faction == faction)
            .count()
    }

    /// The wall-time allowance for one simulation tick.
    #[must_use]
    pub fn budget(&self) -> TickBudget {
        self.budget
    }

    /// Save every living agent's persistent memories. Returns how many
    /// snapshots were written.
    ///
    /// # Errors
    ///
    /// Fails on the first store error.
    pub fn save_snapshots(&self, store: &SnapshotStore) -> Result<usize> {
        let mut saved = 0;
        for agent in self.agents.iter().filter(|a| a.actor.is_alive()) {
            let snapshot = agent.brain.snapshot_memories();
            if snapshot.is_empty() {
                continue;
            }
            store.save(&agent.actor.id, &snapshot)?;
            saved += 1;
        }
        info!(saved, "Saved brain snapshots");
        Ok(saved)
    }

    /// Restore persistent memories for every agent that has a snapshot.
    /// Returns how many agents were restored.
    ///
    /// # Errors
    ///
    /// Fails on the first store error.
    pub fn load_snapshots(&mut self, store: &SnapshotStore) -> Result<usize> {
        let mut restored = 0;
        for agent in &mut self.agents {
            if let Some(snapshot) = store.load(&agent.actor.id)? {
                agent.brain.restore_memories(&snapshot);
                restored += 1;
            }
        }
        Ok(restored)
    }
}
