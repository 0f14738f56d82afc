//! Error types for store and cache operations.

/// Error type for store and cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to read or write the backing file.
    #[error("Store I/O error at '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize a value for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store and cache operations.
pub type Result<T> = std::result::Result<T, Error>;
