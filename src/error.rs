//! Error types for Ratewatch.

use thiserror::Error;

/// Main error type for Ratewatch operations.
///
/// Insufficient data is not an error: rate queries report it as `None`.
#[derive(Error, Debug)]
pub enum RatewatchError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A raw value that does not name an estimation method
    #[error("Unknown estimation method: {0}")]
    UnknownMethod(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Ratewatch operations.
pub type Result<T> = std::result::Result<T, RatewatchError>;
