//! Client error types.

use thiserror::Error;

/// Client error type.
///
/// Used for construction and transport-level failures. Failed resource
/// calls are reported through [`ResourceError`] instead.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable cache store failed.
    #[error("Cache error: {0}")]
    Cache(#[from] slipshot_cache::Error),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a resource call produced no value.
///
/// `Clone` so a single failed fetch can be handed to every caller sharing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The session is not (or no longer) authorized.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No response reached the client.
    #[error("Connection failed: {0}")]
    Connectivity(String),

    /// The server answered with an error.
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message from the server, verbatim.
        message: String,
    },

    /// The server answered successfully but the body did not parse.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for resource calls.
pub type ResourceResult<T> = std::result::Result<T, ResourceError>;

impl ResourceError {
    /// Check if this is an authorization failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ResourceError::Unauthorized(_))
    }

    /// Check if no response reached the client.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ResourceError::Connectivity(_))
    }

    /// Check if this is a not-found response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::Rejected { status: 404, .. })
    }
}

/// Error body shapes the backend emits.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
