//! Synapse Benchmark Suite
//!
//! Per-tick cost targets:
//!   brain_tick_villager .............. < 5μs
//!   brain_tick_guard_in_combat ....... < 10μs
//!   sim_step_100_actors .............. < 1ms
//!   sim_step_1000_actors_parallel .... < 2ms

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use synapse_core::config::BrainConfig;
use synapse_core::types::Location;
use synapse_sim::profiles::{guard_profile, villager_profile};
use synapse_sim::world::{SimActor, SimWorld};
use synapse_sim::{Faction, Simulation};

fn ring(i: usize, n: usize, radius: f32) -> Location {
    #[allow(clippy::cast_precision_loss)]
    let angle = std::f32::consts::TAU * i as f32 / n.max(1) as f32;
    Location::new(radius * angle.cos(), 0.0, radius * angle.sin())
}

fn village(actors: usize, parallel: bool) -> Simulation {
    let config = BrainConfig::default();
    let mut sim = Simulation::new(config.clone()).parallel(parallel).starting_at(3_000);
    for i in 0..actors {
        let (faction, profile) = match i % 10 {
            0 => (Faction::Village, guard_profile(&config, i as u64)),
            9 => (Faction::Raider, guard_profile(&config, i as u64)),
            _ => (Faction::Village, villager_profile(&config, i as u64)),
        };
        let actor = SimActor::new(format!("actor-{i}"), faction, ring(i, actors, 20.0));
        sim.spawn(actor, profile).expect("spawn");
    }
    sim
}

/// Benchmark: one villager brain tick, nobody around (target: < 5μs).
fn bench_villager_tick(c: &mut Criterion) {
    let config = BrainConfig::default();
    let mut brain = villager_profile(&config, 1).build().expect("villager");
    let mut actor = SimActor::new("villager", Faction::Village, Location::default());
    let mut world = SimWorld::new(config.scheduler.ticks_per_day).starting_at(3_000);
    world.refresh_views([&actor]);

    c.bench_function("brain_tick_villager", |b| {
        b.iter(|| {
            brain.tick(black_box(&world), &mut actor);
            world.advance();
        });
    });
}

/// Benchmark: a guard facing a raider (target: < 10μs).
fn bench_guard_in_combat(c: &mut Criterion) {
    let config = BrainConfig::default();
    let mut brain = guard_profile(&config, 2).build().expect("guard");
    let mut guard = SimActor::new("guard", Faction::Village, Location::default());
    let raider = SimActor::new("raider", Faction::Raider, Location::new(1.0, 0.0, 0.0));
    let mut world = SimWorld::new(config.scheduler.ticks_per_day).starting_at(3_000);
    world.refresh_views([&guard, &raider]);

    c.bench_function("brain_tick_guard_in_combat", |b| {
        b.iter(|| {
            brain.tick(black_box(&world), &mut guard);
            guard.pending.clear();
            world.advance();
        });
    });
}

/// Benchmark: full simulation steps, sequential vs rayon.
fn bench_sim_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("sim_step");
    for actors in [100, 1_000] {
        for parallel in [false, true] {
            let mut sim = village(actors, parallel);
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, actors), &actors, |b, _| {
                b.iter(|| black_box(sim.step()));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_villager_tick, bench_guard_in_combat, bench_sim_step);
criterion_main!(benches);
