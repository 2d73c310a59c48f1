//! Error types for the bundle cache engine

use thiserror::Error;

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Error type for cache, registry, and loader operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Missing or malformed key, IV, hash-list path, or other setting
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Size or CRC mismatch against the hash list
    #[error("integrity error: {0}")]
    IntegrityError(String),

    /// Missing file, read or write failure
    #[error("I/O error: {0}")]
    IoError(String),

    /// Deadline exceeded while requesting a bundle
    #[error("timed out: {0}")]
    TimeoutError(String),

    /// A required dependency bundle failed
    #[error("dependency failed: {0}")]
    DependencyError(String),

    /// Cipher transform failure
    #[error("crypto error: {0}")]
    CryptoError(String),

    /// Operation was cancelled through its token
    #[error("operation cancelled")]
    Cancelled,

    /// Registry has not completed setup
    #[error("registry is not initialized")]
    NotInitialized,

    /// Operation is not valid in the current state
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Operation is refused while the registry runs in server mode
    #[error("not allowed in server mode: {0}")]
    ServerMode(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns a stable numeric code for the error kind
    pub fn error_code(&self) -> u32 {
        match self {
            CacheError::ConfigError(_) => 1,
            CacheError::IntegrityError(_) => 2,
            CacheError::IoError(_) => 3,
            CacheError::TimeoutError(_) => 4,
            CacheError::DependencyError(_) => 5,
            CacheError::CryptoError(_) => 6,
            CacheError::Cancelled => 7,
            CacheError::NotInitialized => 8,
            CacheError::InvalidState { .. } => 9,
            CacheError::ServerMode(_) => 10,
            CacheError::Internal(_) => 11,
        }
    }

    /// Create an error from an error code and message
    pub fn from_code(code: u32, message: String) -> Self {
        match code {
            1 => CacheError::ConfigError(message),
            2 => CacheError::IntegrityError(message),
            3 => CacheError::IoError(message),
            4 => CacheError::TimeoutError(message),
            5 => CacheError::DependencyError(message),
            6 => CacheError::CryptoError(message),
            7 => CacheError::Cancelled,
            8 => CacheError::NotInitialized,
            9 => CacheError::InvalidState {
                expected: String::new(),
                actual: message,
            },
            10 => CacheError::ServerMode(message),
            _ => CacheError::Internal(message),
        }
    }

    /// Whether a failed load attempt with this error may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CacheError::IoError(_)
                | CacheError::TimeoutError(_)
                | CacheError::IntegrityError(_)
                | CacheError::CryptoError(_)
                | CacheError::Internal(_)
        )
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::ConfigError(err.to_string())
    }
}
