//! Error types for the synapse core library.
//!
//! The per-tick path never returns errors: misuse degrades to a no-op so one
//! misconfigured actor cannot halt the shared tick loop. Errors only surface
//! from construction, configuration loading and persistence.

use thiserror::Error;

/// Top-level error type for all synapse operations.
#[derive(Error, Debug)]
pub enum BrainError {
    /// Two persistent memory slots were registered under the same name, so
    /// their snapshot entries would collide.
    #[error("Duplicate persistent memory slot name: {name}")]
    DuplicateSlotName {
        /// The clashing slot name.
        name: String,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, BrainError>;
