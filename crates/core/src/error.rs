//! Error types for the Reverie domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Every variant here is local and non-fatal: the cycle runner logs it and
//! carries on with the next perception cycle.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all Reverie operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Collaborator errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Reflection ---
    #[error("Reflection carried no usable rating: {preview}")]
    MalformedReflection { preview: String },

    // --- Repetition ---
    #[error("Response still repetitive after {attempts} regeneration(s), accepting it")]
    RepetitionLoopExhausted { attempts: u32 },

    // --- Persistence ---
    #[error("State persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by the generation collaborator.
///
/// Either one means "no response for this cycle".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation timed out: {0}")]
    Timeout(String),

    #[error("Generation failed: {0}")]
    Failed(String),

    #[error("Generator not configured: {0}")]
    NotConfigured(String),
}

impl GenerationError {
    /// Whether this failure was a timeout rather than an explicit error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Failures loading or saving the persisted session state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read state file at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse state file at {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to write state file at {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_displays_correctly() {
        let err = Error::Generation(GenerationError::Timeout("120s elapsed".into()));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("120s"));
    }

    #[test]
    fn persistence_error_names_path() {
        let err = Error::Persistence(PersistenceError::Write {
            path: PathBuf::from("/tmp/state.json"),
            reason: "disk full".into(),
        });
        assert!(err.to_string().contains("/tmp/state.json"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn timeout_is_distinguished() {
        assert!(GenerationError::Timeout("x".into()).is_timeout());
        assert!(!GenerationError::Failed("x".into()).is_timeout());
    }
}
