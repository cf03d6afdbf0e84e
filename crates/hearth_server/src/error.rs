//! Server error types

use hearth_core::AttributeError;
use hearth_scheduler::SchedulerError;
use hearth_sim::ConfigurationError;
use std::path::PathBuf;
use thiserror::Error;

/// Server configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the config file
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`crate::ServerConfig`]
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// An environment override did not parse
    #[error("Invalid value for {key}: '{value}'")]
    InvalidOverride { key: String, value: String },
    /// A tick period of zero
    #[error("{0} must be greater than zero")]
    ZeroTick(&'static str),
}

/// Player persistence errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Deserialization error
    #[error("Deserialization error in {path}: {reason}")]
    Deserialization { path: PathBuf, reason: String },
}

/// Roster loading errors
#[derive(Debug, Error)]
pub enum RosterError {
    /// Could not read the roster file
    #[error("Failed to read roster {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The roster is not valid TOML
    #[error("Invalid roster: {0}")]
    Parse(#[from] toml::de::Error),
    /// An entity names an area the roster does not declare
    #[error("Entity '{entity}' placed in unknown area '{area}'")]
    UnknownArea { entity: String, area: String },
    /// Two areas share a name
    #[error("Area declared twice: {0}")]
    DuplicateArea(String),
    /// Bad attribute values
    #[error("Entity '{entity}': {source}")]
    Attribute {
        entity: String,
        #[source]
        source: AttributeError,
    },
    /// Behavior config that JSON cannot carry
    #[error("Entity '{entity}': behavior '{behavior}' config: {reason}")]
    BehaviorConfig {
        entity: String,
        behavior: String,
        reason: String,
    },
    /// Behavior wiring failed
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Anything that stops the server from starting or shutting down cleanly
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Result type aliases
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type PersistenceResult<T> = Result<T, PersistenceError>;
pub type RosterResult<T> = Result<T, RosterError>;
pub type ServerResult<T> = Result<T, ServerError>;
