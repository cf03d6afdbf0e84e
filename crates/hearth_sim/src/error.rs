//! Error taxonomy for the simulation core
//!
//! Only [`ConfigurationError`] is fatal, and only at load time. Everything raised while the
//! world is ticking is logged and recovered.

use crate::event::EventKind;
use hearth_core::{AreaId, AttributeError, EntityId};
use thiserror::Error;

/// Problems with how behaviors and entities are wired together
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No factory registered for this behavior kind
    #[error("Unknown behavior kind: {0}")]
    UnknownBehavior(String),

    /// A factory for this kind already exists
    #[error("Behavior kind already registered: {0}")]
    DuplicateBehavior(String),

    /// The entity already carries this behavior
    #[error("Behavior '{behavior}' already attached to {entity}")]
    DuplicateAttachment { entity: EntityId, behavior: String },

    /// The factory refused the configuration
    #[error("Invalid config for behavior '{behavior}': {reason}")]
    InvalidConfig { behavior: String, reason: String },

    /// The entity to attach to does not exist
    #[error("No such entity: {0}")]
    UnknownEntity(EntityId),

    /// An entity with this id is already in the world
    #[error("Entity already exists: {0}")]
    DuplicateEntity(EntityId),

    /// The area does not exist
    #[error("No such area: {0}")]
    UnknownArea(AreaId),

    /// A handler re-dispatched the event it is handling onto its own entity
    #[error("Dispatch cycle: '{event}' re-entered on {entity}")]
    DispatchCycle { entity: EntityId, event: EventKind },
}

/// Failure inside a behavior's event handler
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Wiring problem surfaced while handling; aborts the dispatch
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A combat call made by the handler failed
    #[error(transparent)]
    Combat(#[from] CombatResolutionError),

    /// Attribute access failed
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// The handler panicked
    #[error("Handler panicked: {0}")]
    Panicked(String),

    /// Anything else the behavior wants to report
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Create a generic handler failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// The configuration error carried by this failure, if any. These abort the dispatch.
    pub fn as_configuration(&self) -> Option<&ConfigurationError> {
        match self {
            Self::Configuration(e) | Self::Combat(CombatResolutionError::Dispatch(e)) => Some(e),
            _ => None,
        }
    }
}

/// Invalid combat state. Inside a round these are recovered by dropping the opponent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatResolutionError {
    /// The entity is not in the registry (removed, never spawned)
    #[error("No such entity: {0}")]
    UnknownEntity(EntityId),

    /// The entity is dead
    #[error("Entity is not live: {0}")]
    NotLive(EntityId),

    /// An entity may not fight itself
    #[error("Entity cannot engage itself: {0}")]
    SelfTarget(EntityId),

    /// The target has no attribute of that name
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// An event raised by the combat step hit a wiring error
    #[error(transparent)]
    Dispatch(#[from] ConfigurationError),
}

/// Result type for load-time wiring
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Result type returned by event handlers
pub type HandlerResult = Result<(), HandlerError>;

/// Result type for combat operations
pub type CombatResult<T> = Result<T, CombatResolutionError>;
