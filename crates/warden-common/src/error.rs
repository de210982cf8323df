//! Error types shared across Warden crates.

use thiserror::Error;

/// Top-level error type for Warden operations.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Configuration could not be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// Archetype definition was rejected
    #[error("Archetype error: {0}")]
    Archetype(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An agent referenced by ID is not registered
    #[error("Unknown agent: {0}")]
    UnknownAgent(crate::EntityId),
}

/// Result type alias for Warden operations.
pub type WardenResult<T> = Result<T, WardenError>;
