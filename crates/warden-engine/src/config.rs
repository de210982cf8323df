//! Runner configuration.
//!
//! Loaded from a TOML file. Missing or broken files fall back to defaults so
//! the runner always starts.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "warden.toml";

/// Errors reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read file
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse TOML
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Built-in scenarios the runner can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Target sneaks up on a guard, strikes from behind and is chased down
    #[default]
    Ambush,
    /// Target wanders past a patrol without engaging
    Patrol,
}

/// Runner configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Ticks to run before stopping
    pub max_ticks: u32,
    /// Seed for the director's random source
    pub seed: u64,
    /// Radius of the alert fan-out
    pub alert_radius: f32,
    /// Directory holding archetype TOML files
    pub archetype_dir: PathBuf,
    /// Scenario to play
    pub scenario: ScenarioKind,
    /// Pace ticks to wall-clock time instead of running flat out
    pub realtime: bool,
    /// Write the event stream as JSON to this file when the run ends
    pub event_dump: Option<PathBuf>,
    /// Capacity of the agent event bus
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30,
            max_ticks: 900,
            seed: 0x5EED,
            alert_radius: 15.0,
            archetype_dir: PathBuf::from("assets/archetypes"),
            scenario: ScenarioKind::Ambush,
            realtime: false,
            event_dump: None,
            event_capacity: 4096,
        }
    }
}

impl EngineConfig {
    /// Loads configuration, returning defaults if the file is missing or
    /// invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("{e}; using defaults");
                Self::default()
            },
        }
    }

    /// Loads configuration, reporting read and parse failures.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration as pretty TOML.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamps values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(1, 240);
        self.max_ticks = self.max_ticks.max(1);
        self.alert_radius = self.alert_radius.clamp(0.0, 500.0);
        self.event_capacity = self.event_capacity.clamp(16, 1 << 20);
    }

    /// Seconds per tick.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.scenario, ScenarioKind::Ambush);
        assert!(!config.realtime);
        assert!((config.fixed_dt() - 1.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig {
            tick_rate: 0,
            max_ticks: 0,
            alert_radius: -3.0,
            event_capacity: 1,
            ..EngineConfig::default()
        };
        config.validate();
        assert_eq!(config.tick_rate, 1);
        assert_eq!(config.max_ticks, 1);
        assert_eq!(config.alert_radius, 0.0);
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("warden.toml");

        let config = EngineConfig {
            tick_rate: 60,
            seed: 99,
            scenario: ScenarioKind::Patrol,
            event_dump: Some(PathBuf::from("events.json")),
            ..EngineConfig::default()
        };
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/warden.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "tick_rate = \"fast\"").expect("write");

        assert!(matches!(EngineConfig::try_load_from(&path), Err(ConfigError::Parse(_))));
        assert_eq!(EngineConfig::load_from(&path), EngineConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: EngineConfig = toml::from_str("scenario = \"patrol\"\nmax_ticks = 10").expect("valid");
        assert_eq!(config.scenario, ScenarioKind::Patrol);
        assert_eq!(config.max_ticks, 10);
        assert_eq!(config.tick_rate, 30);
    }
}
