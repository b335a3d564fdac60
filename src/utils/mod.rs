//! Shared helpers that do not belong to a single pipeline stage

pub mod time;

pub use time::{now_in, parse_clock_override, parse_xmltv_timestamp, validate_timezone};
