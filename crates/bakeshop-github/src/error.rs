//! Source-specific error types.

use bakeshop_core::Error as CoreError;
use std::fmt;

/// Errors from the GitHub source.
///
/// These cover configuration and transport problems only; a 404 or an API
/// error payload is not an error here, it is a recorded
/// [`FetchFailure`](crate::source::FetchFailure).
#[derive(Debug)]
pub enum SourceError {
    /// Network error during fetch.
    Network {
        /// URL that failed.
        url: String,
        /// Error message.
        message: String,
    },
    /// Invalid request URL.
    InvalidUrl {
        /// The invalid URL.
        url: String,
        /// Error message.
        message: String,
    },
    /// Path template could not be parsed or resolved.
    Template {
        /// The template string.
        template: String,
        /// Error message.
        message: String,
    },
    /// Invalid source configuration.
    Config {
        /// Error message.
        message: String,
    },
    /// Response could not be converted into the expected shape.
    Parse {
        /// Model or URL the payload came from.
        source: String,
        /// Error message.
        message: String,
    },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { url, message } => {
                write!(f, "Network error fetching {url}: {message}")
            }
            Self::InvalidUrl { url, message } => {
                write!(f, "Invalid URL '{url}': {message}")
            }
            Self::Template { template, message } => {
                write!(f, "Path template '{template}': {message}")
            }
            Self::Config { message } => {
                write!(f, "Invalid source configuration: {message}")
            }
            Self::Parse { source, message } => {
                write!(f, "Failed to parse response from {source}: {message}")
            }
        }
    }
}

impl std::error::Error for SourceError {}

impl From<SourceError> for CoreError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Network { url, message } => {
                Self::Network(format!("{url}: {message}"))
            }
            SourceError::InvalidUrl { message, .. } => Self::Config(message),
            SourceError::Template { template, message } => {
                Self::Template(format!("{template}: {message}"))
            }
            SourceError::Config { message } => Self::Config(message),
            SourceError::Parse { source, message } => {
                Self::Record(format!("{source}: {message}"))
            }
        }
    }
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
