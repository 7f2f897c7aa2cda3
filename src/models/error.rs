//! Error types for podnk.
//!
//! Three families, none of which are caught inside the pipeline:
//! - Configuration: missing or malformed keys, credentials, template variables
//! - Generation: anything that goes wrong talking to the model service
//! - Filesystem: artifact and audit writes

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for podnk.
#[derive(Debug, Error)]
pub enum PodError {
    // ═══════════════════════════════════════════════════════════════════
    // Configuration
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    // ═══════════════════════════════════════════════════════════════════
    // Generation service
    // ═══════════════════════════════════════════════════════════════════

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // ═══════════════════════════════════════════════════════════════════
    // Filesystem
    // ═══════════════════════════════════════════════════════════════════

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Generation service errors.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty response from model for stage '{0}'")]
    EmptyResponse(String),

    #[error("Expected {expected} completion(s) for stage '{stage}', got {actual}")]
    CandidateCount {
        stage: String,
        expected: usize,
        actual: usize,
    },
}

impl PodError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the failure came from the model service.
    pub fn is_generation(&self) -> bool {
        matches!(self, Self::Generation(_))
    }
}

/// Result type alias for podnk.
pub type Result<T> = std::result::Result<T, PodError>;
