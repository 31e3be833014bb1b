//! Error types for the DNS-lease failover system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for failover operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the failover system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend read failure (lease state could not be observed)
    #[error("Backend read error: {0}")]
    BackendRead(String),

    /// Backend write failure (lease state could not be asserted)
    #[error("Backend write error: {0}")]
    BackendWrite(String),

    /// Authentication or permission failure against a backend API
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transient network failure (timeouts, 5xx, unreachable endpoints)
    #[error("Network error: {0}")]
    Network(String),

    /// Record or zone not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Concurrent-modification conflict reported by a backend
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Health probe target unreachable or response unparseable
    #[error("Health probe error: {0}")]
    HealthProbe(String),

    /// TXT record present but not a well-formed lease
    #[error("Lease parse error: {0}")]
    LeaseParse(String),

    /// Worker start/stop command failed
    #[error("Worker control error: {0}")]
    WorkerControl(String),

    /// Operation refused because a precondition does not hold
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a backend read error
    pub fn backend_read(msg: impl Into<String>) -> Self {
        Self::BackendRead(msg.into())
    }

    /// Create a backend write error
    pub fn backend_write(msg: impl Into<String>) -> Self {
        Self::BackendWrite(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a health probe error
    pub fn health_probe(msg: impl Into<String>) -> Self {
        Self::HealthProbe(msg.into())
    }

    /// Create a lease parse error
    pub fn lease_parse(msg: impl Into<String>) -> Self {
        Self::LeaseParse(msg.into())
    }

    /// Create a worker control error
    pub fn worker_control(msg: impl Into<String>) -> Self {
        Self::WorkerControl(msg.into())
    }

    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Whether this error is worth retrying on the next loop iteration
    ///
    /// Auth failures stay broken until an operator fixes credentials;
    /// everything network-shaped is expected to clear on its own.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Auth(_) | Self::Config(_) | Self::Precondition(_))
    }
}
