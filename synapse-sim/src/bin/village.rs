//! Village simulation runner.
//!
//! Spawns villagers, guards and raiders around a village square, runs the
//! simulation for a number of ticks and prints survivor counts, budget
//! overruns and brain counters (with the tick-duration histogram) in
//! Prometheus text format.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use synapse_core::config::BrainConfig;
use synapse_core::metrics;
use synapse_core::types::Location;
use synapse_core::SnapshotStore;
use synapse_sim::profiles::{guard_profile, villager_profile};
use synapse_sim::{Faction, SimActor, Simulation};

#[derive(Debug, Parser)]
#[command(name = "village", about = "Run a village of synapse brains")]
struct Args {
    /// Number of villagers.
    #[arg(long, default_value_t = 20)]
    villagers: usize,
    /// Number of village guards.
    #[arg(long, default_value_t = 4)]
    guards: usize,
    /// Number of raiders approaching from outside.
    #[arg(long, default_value_t = 3)]
    raiders: usize,
    /// Ticks to simulate.
    #[arg(long, default_value_t = 24_000)]
    ticks: u64,
    /// Placement and behavior seed (defaults to the configured seed).
    #[arg(long)]
    seed: Option<u64>,
    /// Path to a `synapse.toml`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Tick brains on the rayon pool.
    #[arg(long)]
    parallel: bool,
    /// Save persistent memories to this SQLite file when done.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

const VILLAGE_RADIUS: f32 = 15.0;
const RAIDER_DISTANCE: f32 = 40.0;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => BrainConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => BrainConfig::default(),
    };

    let level = &config.general.log_level;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("village={level},synapse_core={level},synapse_sim={level}"))),
        )
        .init();
    let seed = args.seed.unwrap_or(config.sensors.seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut sim = Simulation::new(config.clone()).parallel(args.parallel);
    for i in 0..args.villagers {
        let home = around(&mut rng, 0.0, VILLAGE_RADIUS);
        sim.spawn(
            SimActor::new(format!("villager-{i}"), Faction::Village, home),
            villager_profile(&config, rng.r#gen()),
        )?;
    }
    for i in 0..args.guards {
        let home = around(&mut rng, 0.0, VILLAGE_RADIUS / 2.0);
        sim.spawn(
            SimActor::new(format!("guard-{i}"), Faction::Village, home),
            guard_profile(&config, rng.r#gen()),
        )?;
    }
    for i in 0..args.raiders {
        // Raiders "live" at the village so their walk home leads them in.
        let mut raider = SimActor::new(format!("raider-{i}"), Faction::Raider, Location::new(0.0, 0.0, 0.0));
        raider.location = around(&mut rng, RAIDER_DISTANCE, RAIDER_DISTANCE + 5.0);
        sim.spawn(raider, guard_profile(&config, rng.r#gen()))?;
    }

    tracing::info!(
        villagers = args.villagers,
        guards = args.guards,
        raiders = args.raiders,
        ticks = args.ticks,
        seed,
        parallel = args.parallel,
        "Village starting"
    );

    let report = sim.run(args.ticks);

    if let Some(path) = &args.snapshot {
        let store = SnapshotStore::open(path, &config.persistence)
            .with_context(|| format!("opening snapshot store {}", path.display()))?;
        let saved = sim.save_snapshots(&store)?;
        let backups = store.rotate_backups()?;
        tracing::info!(saved, backups, path = %path.display(), "Snapshots saved");
    }

    println!("=== village after {} ticks ===", args.ticks);
    println!("villagers/guards alive: {}", sim.living(Faction::Village));
    println!("raiders alive:          {}", sim.living(Faction::Raider));
    println!("killed:                 {}", report.killed);
    println!("quarantined:            {}", report.quarantined);
    println!(
        "ticks over budget:      {} (budget {}µs)",
        report.over_budget,
        sim.budget().as_micros()
    );
    println!();
    print!("{}", metrics::counters().snapshot().to_prometheus());
    Ok(())
}

/// A random point on the ring between `min` and `max` around the origin.
fn around(rng: &mut StdRng, min: f32, max: f32) -> Location {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = if max > min { rng.gen_range(min..max) } else { min };
    Location::new(distance * angle.cos(), 0.0, distance * angle.sin())
}
