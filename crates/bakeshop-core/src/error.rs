//! Error types for Bakeshop operations.

use thiserror::Error;

/// Main error type for Bakeshop.
#[derive(Error, Debug)]
pub enum Error {
    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Path template error.
    #[error("template error: {0}")]
    Template(String),

    /// Record conversion error.
    #[error("record error: {0}")]
    Record(String),
}

/// Result type for Bakeshop operations.
pub type Result<T> = std::result::Result<T, Error>;
