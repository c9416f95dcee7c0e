use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use floe::{
    engine::{EngineBuilder, EngineSettings},
    logging,
    scenario::ScenarioLoader,
    systems::{DispatchSystem, HousekeepingSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Colony simulation runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/valley.yaml")]
    scenario: PathBuf,

    /// Override turn count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override snapshot interval in turns
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `floe=trace`; RUST_LOG wins when set
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    logging::init(cli.log_level.as_deref().unwrap_or(&scenario.logging.level));

    let mut world = scenario.build_world()?;
    let ticks = scenario.ticks(cli.ticks);
    let snapshot_interval = cli
        .snapshot_interval
        .unwrap_or(scenario.snapshot_interval_ticks);
    let snapshot_dir = cli
        .snapshot_dir
        .unwrap_or_else(|| PathBuf::from("snapshots"));

    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };

    let mut engine = EngineBuilder::new(settings)
        .with_system(DispatchSystem::new())
        .with_system(HousekeepingSystem::new())
        .build();

    engine.run(&mut world, ticks)?;
    let totals = world.dispatch_totals();
    println!(
        "Scenario '{}' completed for {} turns. Jobs: {} assigned, {} completed, {} failed",
        scenario.name, ticks, totals.assigned, totals.completed, totals.failed
    );
    Ok(())
}
