//! Annotates an M3U playlist with live and upcoming sports events from an XMLTV guide.
//!
//! A run resolves each playlist entry to a guide channel, classifies that
//! channel's programmes against the clock and writes a playlist containing only
//! the entries that carry something worth watching, relabelled with what is on.

pub mod config;
pub mod errors;
pub mod matching;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod schedule;
pub mod sources;
pub mod utils;

pub use pipeline::{Annotation, Annotator};
