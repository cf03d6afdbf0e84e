//! Error types for the core library

use thiserror::Error;

/// Attribute store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// No attribute with this name on the entity
    #[error("Unknown attribute: {0}")]
    Unknown(String),
    /// Attribute already present
    #[error("Attribute already exists: {0}")]
    AlreadyExists(String),
    /// Base values may not be negative
    #[error("Attribute '{name}' has negative base {base}")]
    NegativeBase { name: String, base: i32 },
}

/// Result type alias
pub type AttributeResult<T> = Result<T, AttributeError>;
