//! Error types for makersuite-gateway.

use thiserror::Error;

/// The main error type for makersuite-gateway.
#[derive(Debug, Error)]
pub enum Error {
    // ── Discovery ────────────────────────────────────────────────────────────
    /// A required environment capability (script introspection, secret store)
    /// is unavailable. Fatal; no retry.
    #[error("Missing capability: {0}")]
    MissingCapability(String),

    /// Credential discovery completed but found zero usable API keys.
    #[error("No API credentials discovered")]
    NoCredentials,

    /// The service origin could not be located. No request is possible.
    #[error("Service origin not found in environment")]
    OriginNotFound,

    // ── Dispatch ─────────────────────────────────────────────────────────────
    /// A single transmission attempt returned a non-success status.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Every credential in the pool was tried and none succeeded.
    #[error("All {attempts} credentials exhausted: {message}")]
    AllCredentialsExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Combined description of the per-attempt failures.
        message: String,
    },

    // ── Infrastructure ───────────────────────────────────────────────────────
    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A single attempt exceeded the per-attempt timeout.
    #[error("Attempt timed out")]
    Timeout,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if this error ends the whole dispatch rather than a
    /// single attempt.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MissingCapability(_)
                | Error::NoCredentials
                | Error::OriginNotFound
                | Error::AllCredentialsExhausted { .. }
                | Error::Config(_)
        )
    }

    /// Creates a missing-capability error.
    #[must_use]
    pub fn missing_capability(what: impl Into<String>) -> Self {
        Self::MissingCapability(what.into())
    }

    /// Creates a per-attempt API error.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

/// Convenience type alias.
pub type Result<T> = std::result::Result<T, Error>;
