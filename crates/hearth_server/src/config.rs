//! Server configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Command line flags (see the `hearth` binary)
//! 2. Environment variables: `HEARTH_ENTITY_TICK`, `HEARTH_PLAYER_TICK`, `HEARTH_SAVE`,
//!    `HEARTH_DATA_DIR`, `HEARTH_ROSTER`, `HEARTH_SEED`
//! 3. Config file given with `--config`
//! 4. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! entity_tick_ms = 100
//! player_tick_ms = 100
//! save_secs = 10        # 0 disables autosave
//! data_dir = "data"
//! save_format = "json"  # json, binary
//! roster = "roster.toml"
//!
//! [world]
//! regen_per_tick = 1
//! rng_seed = 42
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::persistence::SaveFormat;
use hearth_scheduler::{TickConfig, DEFAULT_CAPACITY};
use hearth_sim::WorldSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// World tick period in milliseconds
    pub entity_tick_ms: u64,
    /// Player tick period in milliseconds
    pub player_tick_ms: u64,
    /// Autosave period in seconds, 0 disables
    pub save_secs: u64,
    /// Root directory for saved data
    pub data_dir: PathBuf,
    /// Player save format
    pub save_format: SaveFormat,
    /// Areas and entities to load at startup
    pub roster: Option<PathBuf>,
    /// Capacity of the tick channel
    pub tick_capacity: usize,
    /// Simulation tunables
    pub world: WorldSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            entity_tick_ms: 100,
            player_tick_ms: 100,
            save_secs: 10,
            data_dir: PathBuf::from("data"),
            save_format: SaveFormat::Json,
            roster: None,
            tick_capacity: DEFAULT_CAPACITY,
            world: WorldSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `HEARTH_*` environment overrides
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_vars<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse_var(&lookup, "HEARTH_ENTITY_TICK")? {
            self.entity_tick_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "HEARTH_PLAYER_TICK")? {
            self.player_tick_ms = ms;
        }
        if let Some(secs) = parse_var(&lookup, "HEARTH_SAVE")? {
            self.save_secs = secs;
        }
        if let Some(dir) = lookup("HEARTH_DATA_DIR").filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(roster) = lookup("HEARTH_ROSTER").filter(|v| !v.is_empty()) {
            self.roster = Some(PathBuf::from(roster));
        }
        if let Some(seed) = parse_var(&lookup, "HEARTH_SEED")? {
            self.world.rng_seed = Some(seed);
        }
        Ok(())
    }

    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.entity_tick_ms == 0 {
            return Err(ConfigError::ZeroTick("entity_tick_ms"));
        }
        if self.player_tick_ms == 0 {
            return Err(ConfigError::ZeroTick("player_tick_ms"));
        }
        Ok(())
    }

    /// Timer periods for the scheduler
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            entity_tick: Duration::from_millis(self.entity_tick_ms),
            player_tick: Duration::from_millis(self.player_tick_ms),
            save_interval: Duration::from_secs(self.save_secs),
        }
    }

    /// Directory player files live in
    pub fn player_dir(&self) -> PathBuf {
        self.data_dir.join("players")
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidOverride {
                key: key.to_string(),
                value,
            }),
        _ => Ok(None),
    }
}

/// Values given on the command line. They win over the file and the environment, and are
/// re-applied when the config file is reloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub entity_tick_ms: Option<u64>,
    pub player_tick_ms: Option<u64>,
    pub save_secs: Option<u64>,
    pub roster: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(ms) = self.entity_tick_ms {
            config.entity_tick_ms = ms;
        }
        if let Some(ms) = self.player_tick_ms {
            config.player_tick_ms = ms;
        }
        if let Some(secs) = self.save_secs {
            config.save_secs = secs;
        }
        if let Some(roster) = &self.roster {
            config.roster = Some(roster.clone());
        }
        if let Some(seed) = self.seed {
            config.world.rng_seed = Some(seed);
        }
    }
}

/// Build the effective config from every source
pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> ConfigResult<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    config.apply_env()?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}
