//! Error types for DermAid.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Product catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to load catalog from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Weather lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Weather request failed: {0}")]
    RequestFailed(String),

    #[error("Weather upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Weather lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Rejected agent turn requests. Collaborator failures never surface here;
/// the loops degrade them instead.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("userId and scan are required")]
    MissingRequired,

    #[error("Invalid request body: {0}")]
    InvalidInput(String),
}
