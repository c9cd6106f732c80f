use std::fs;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use grid_mapf::config::{Cli, Config};
use grid_mapf::map::Map;
use grid_mapf::scenario::Scenario;
use grid_mapf::solver::{Solver, CBS};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
            Config::from_yaml_str(&text)?
        }
        None => Config::default(),
    };
    let config = config.override_from_command_line(&cli)?;

    let map = Map::from_file(&config.map_path)?;

    let agents = if let Some(agents_path) = &config.agents_path {
        Scenario::load_agents_from_yaml(agents_path)?
    } else if let Some(scen_path) = &config.scen_path {
        let scenario = Scenario::load_from_scen(scen_path)?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        scenario.generate_agents_randomly(config.num_agents, &mut rng)?
    } else {
        bail!("no agent source configured");
    };

    for agent in &agents {
        if !agent.verify(&map) {
            bail!("agent {} has a blocked or out-of-bounds endpoint", agent.id);
        }
    }

    let mut solver = CBS::new(agents.clone(), &map);
    if let Some(secs) = config.time_limit_secs {
        solver = solver.with_time_limit(Duration::from_secs(secs));
    }

    let solution = solver.solve()?;
    if !solution.verify(&map, &agents) {
        bail!("solver produced an invalid solution");
    }
    solution.log_solution();
    info!("solved {} agents with cost {}", agents.len(), solution.cost());

    Ok(())
}
