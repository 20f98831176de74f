use clap::Parser;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ClockError;
use crate::registry::DEFAULT_MAX_INSTANCES;

/// The structure of a valid worldclock configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// File path or http(s) URL of the time-zone list
    pub timezones_source: String,
    /// Number of clocks to put on the page
    pub clocks: usize,
    /// Maximum number of clocks the registry will create
    pub max_instances: usize,
    /// Render loop period in milliseconds
    pub tick_interval_ms: u64,
    /// How often the console page is repainted, in milliseconds
    pub refresh_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timezones_source: "./data/timezones.json".to_string(),
            clocks: 2,
            max_instances: DEFAULT_MAX_INSTANCES,
            tick_interval_ms: 100,
            refresh_interval_ms: 1000,
        }
    }
}

pub async fn parse_config<P>(path: P) -> Result<Config, ClockError>
where
    P: AsRef<std::path::Path>,
{
    if let Ok(config_file) = tokio::fs::read_to_string(&path).await {
        Ok(toml::from_str(&config_file).map_err(ClockError::ConfigFileParsingError)?)
    } else {
        warn!("unable to read config file, using default config");
        Ok(Config::default())
    }
}

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    #[arg(short, long, help = "Path to a TOML config file")]
    pub config: Option<String>,

    #[arg(short, long, help = "Time-zone list to load (file path or http(s) URL)")]
    pub source: Option<String>,

    #[arg(short = 'n', long, help = "Number of clocks to show")]
    pub clocks: Option<usize>,
}

impl Args {
    /// Loads the config file, if any, and applies command-line overrides.
    pub async fn resolve_config(&self) -> Result<Config, ClockError> {
        let mut config = match &self.config {
            Some(path) => parse_config(path).await?,
            None => Config::default(),
        };
        if let Some(source) = &self.source {
            config.timezones_source = source.clone();
        }
        if let Some(clocks) = self.clocks {
            config.clocks = clocks;
        }
        Ok(config)
    }
}
