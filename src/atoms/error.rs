// ── Readbot Atoms: Error Types ─────────────────────────────────────────────
// Single canonical error enum for the bot, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (I/O, network, config, session…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • No variant carries secret material (the Evolution API key) in its message.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Filesystem, socket or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Bot configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The messaging backend rejected or failed an operation.
    #[error("Session error: {operation}: {message}")]
    Session { operation: String, message: String },

    /// Catch-all for errors that do not have a dedicated variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create a session error for a named backend operation.
    pub fn session(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Session { operation: operation.into(), message: message.into() }
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Other(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Other(s.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All fallible bot operations return this type.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<EngineError> for String {
    fn from(e: EngineError) -> Self {
        e.to_string()
    }
}
