use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use anyhow::{bail, Context, Result};
use rand::prelude::*;
use tracing::info;

use crate::common::Agent;

/// One start/goal pair from a scenario file, in `(row, col)` order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Route {
    pub start: (usize, usize),
    pub goal: (usize, usize),
}

/// MovingAI-style `.scen` benchmark file: a version header followed by one
/// route per line (bucket, map name, map dimensions, start and goal given
/// column-first, optimal distance).
#[derive(Debug)]
pub struct Scenario {
    pub map: String,
    pub map_width: usize,
    pub map_height: usize,
    pub routes: Vec<Route>,
}

impl Scenario {
    pub fn load_from_scen(path: &str) -> Result<Scenario> {
        let file = File::open(path).with_context(|| format!("opening scenario file {path}"))?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let _version = lines
            .next()
            .context("scenario file is empty")?
            .context("reading scenario header")?;

        let mut scenario = Scenario {
            map: String::new(),
            map_width: 0,
            map_height: 0,
            routes: Vec::new(),
        };

        for (line_number, line) in lines.enumerate() {
            let line = line.with_context(|| format!("reading scenario line {line_number}"))?;
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 9 {
                bail!("scenario line {line_number} has {} fields, expected 9", parts.len());
            }

            // Columns come before rows in the file.
            let route = Route {
                start: (parts[5].parse()?, parts[4].parse()?),
                goal: (parts[7].parse()?, parts[6].parse()?),
            };

            if scenario.map.is_empty() {
                scenario.map = parts[1].to_string();
                scenario.map_width = parts[2].parse()?;
                scenario.map_height = parts[3].parse()?;
            }

            scenario.routes.push(route);
        }

        Ok(scenario)
    }

    /// Samples `num_agents` distinct routes, ids assigned in draw order.
    /// Deterministic for a seeded rng.
    pub fn generate_agents_randomly<R: Rng + ?Sized>(
        &self,
        num_agents: usize,
        rng: &mut R,
    ) -> Result<Vec<Agent>> {
        if self.routes.len() < num_agents {
            bail!(
                "scenario holds {} routes, cannot sample {num_agents} agents",
                self.routes.len()
            );
        }

        let mut available_routes = self.routes.clone();
        available_routes.sort();
        available_routes.shuffle(rng);

        let agents: Vec<Agent> = available_routes
            .into_iter()
            .take(num_agents)
            .enumerate()
            .map(|(id, route)| Agent {
                id,
                start: route.start,
                goal: route.goal,
            })
            .collect();

        info!("Generated scen: {agents:?}");
        Ok(agents)
    }

    pub fn load_agents_from_yaml(path: &str) -> Result<Vec<Agent>> {
        let file = File::open(path).with_context(|| format!("opening agent file {path}"))?;
        let reader = BufReader::new(file);
        let agents: Vec<Agent> = serde_yaml::from_reader(reader)?;
        Ok(agents)
    }

    pub fn write_agents_to_yaml(path: &str, agents: &[Agent]) -> Result<()> {
        let file = File::create(path).with_context(|| format!("creating agent file {path}"))?;
        let mut writer = BufWriter::new(file);
        let yaml_data = serde_yaml::to_string(&agents)?;
        writer.write_all(yaml_data.as_bytes())?;
        Ok(())
    }
}
