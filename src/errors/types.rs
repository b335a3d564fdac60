//! Error type definitions for the EPG live annotator

use thiserror::Error;

/// Top-level application error type
///
/// Any of these aborts a run: the core cannot produce trustworthy output
/// without a complete channel/programme universe.
#[derive(Error, Debug)]
pub enum AppError {
    /// Source handling errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Filesystem errors while writing outputs
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Source handling specific errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network or filesystem fetch failures
    #[error("Fetch failed: {location} - {message}")]
    Fetch { location: String, message: String },

    /// Connection timeouts
    #[error("Connection timeout: {location}")]
    Timeout { location: String },

    /// HTTP errors from the remote host
    #[error("HTTP error: {status} - {location}")]
    Http { status: u16, location: String },

    /// Compressed payload could not be expanded
    #[error("Decompression failed: {location} - {message}")]
    Decompression { location: String, message: String },

    /// Parsing errors for source data
    #[error("Parse error: {source_type} - {message}")]
    ParseError { source_type: String, message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Create a fetch error
    pub fn fetch<L: Into<String>, M: Into<String>>(location: L, message: M) -> Self {
        Self::Fetch {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<L: Into<String>>(location: L) -> Self {
        Self::Timeout {
            location: location.into(),
        }
    }

    /// Create a decompression error
    pub fn decompression<L: Into<String>, M: Into<String>>(location: L, message: M) -> Self {
        Self::Decompression {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse_error<S: Into<String>, M: Into<String>>(source_type: S, message: M) -> Self {
        Self::ParseError {
            source_type: source_type.into(),
            message: message.into(),
        }
    }
}
