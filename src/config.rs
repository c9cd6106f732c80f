use anyhow::bail;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(
    name = "grid-mapf",
    about = "Conflict-Based Search MAPF solver for 4- and 8-connected grids.",
    version = "0.1.0"
)]
pub struct Cli {
    #[arg(long, short, help = "Path to the YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Map file path")]
    pub map_path: Option<String>,

    #[arg(long, help = "Agent list (YAML) path")]
    pub agents_path: Option<String>,

    #[arg(long, help = "Scenario (.scen) path to sample agents from")]
    pub scen_path: Option<String>,

    #[arg(long, help = "Number of agents sampled from the scenario")]
    pub num_agents: Option<usize>,

    #[arg(long, help = "Random seed for scenario sampling")]
    pub seed: Option<u64>,

    #[arg(long, help = "Solver wall-clock limit in seconds")]
    pub time_limit_secs: Option<u64>,
}

#[derive(Serialize, Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub map_path: String,
    pub agents_path: Option<String>,
    pub scen_path: Option<String>,
    pub num_agents: usize,
    pub seed: u64,
    pub time_limit_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map_path: "map_file/test/test.map".to_string(),
            agents_path: Some("map_file/test/test.yaml".to_string()),
            scen_path: None,
            num_agents: 2,
            seed: 0,
            time_limit_secs: None,
        }
    }
}

impl Config {
    pub fn from_yaml_str(config_str: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(config_str)?;
        config.validate()
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(map_path) = &cli.map_path {
            self.map_path = map_path.clone();
        }
        if let Some(agents_path) = &cli.agents_path {
            self.agents_path = Some(agents_path.clone());
            self.scen_path = None;
        }
        if let Some(scen_path) = &cli.scen_path {
            self.scen_path = Some(scen_path.clone());
            self.agents_path = None;
        }
        if let Some(num_agents) = cli.num_agents {
            self.num_agents = num_agents;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(time_limit_secs) = cli.time_limit_secs {
            self.time_limit_secs = Some(time_limit_secs);
        }
        self.validate()
    }

    pub fn validate(self) -> anyhow::Result<Self> {
        if self.agents_path.is_none() && self.scen_path.is_none() {
            bail!("either an agent list or a scenario file must be configured");
        }
        if self.scen_path.is_some() && self.num_agents == 0 {
            bail!("sampling from a scenario needs num_agents > 0");
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_from_yaml_str() {
        let config = Config::from_yaml_str(
            "map_path: map_file/test/test.map\nscen_path: map_file/test/test.scen\nagents_path: null\nnum_agents: 3\nseed: 7\n",
        )
        .unwrap();

        assert_eq!(config.scen_path.as_deref(), Some("map_file/test/test.scen"));
        assert_eq!(config.num_agents, 3);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_rejects_missing_agent_source() {
        assert!(Config::from_yaml_str("agents_path: null\nscen_path: null\n").is_err());
    }
}
