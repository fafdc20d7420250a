//! Error types for the Engram core library.

use thiserror::Error;

/// Top-level error type for all Engram operations.
#[derive(Error, Debug)]
pub enum EngramError {
    /// A record failed its kind-specific validation checks.
    /// Rejected before any storage mutation — never partially applied.
    #[error("Validation failed for '{id}': {reason}")]
    Validation {
        /// The offending record id.
        id: crate::MemoryId,
        /// Which check failed.
        reason: String,
    },

    /// A memory with the given id was not found.
    #[error("Memory not found: {0}")]
    NotFound(crate::MemoryId),

    /// Bulk import could not be parsed at the top level.
    /// (Per-entry failures are skipped and counted, not surfaced here.)
    #[error("Import failed: {0}")]
    Import(String),

    /// A serialized record carried an unknown or malformed kind tag.
    #[error("Cannot deserialize memory record: {0}")]
    Deserialization(String),

    /// Serialization failure during export.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (bad TOML, out-of-range weight, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Content sealing/unsealing failed at the cipher boundary.
    #[error("Cipher error: {0}")]
    Cipher(String),

    /// Generic I/O error (config file loading only — the engine itself
    /// performs no I/O).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, EngramError>;
