//! Centralized error handling for the EPG live annotator
//!
//! Only upstream acquisition failures are errors in this crate. Everything the
//! annotation core tolerates (malformed programmes, unmatched channels,
//! malformed playlist entries) is reported through
//! [`crate::models::RunDiagnostics`] instead.
//!
//! # Error Categories
//!
//! - **Source Errors**: fetching, decompressing and parsing the guide or playlist
//! - **Configuration Errors**: invalid or unreadable configuration
//! - **I/O Errors**: writing the rendered playlist and reports
//!
//! # Usage
//!
//! ```rust
//! use epg_live::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
