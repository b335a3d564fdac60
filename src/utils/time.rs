//! Time utilities for guide timestamps and the run clock
//!
//! Everything downstream of parsing works in the guide's local civil time
//! (`NaiveDateTime` in the configured timezone). Offsets carried by guide
//! timestamps are folded into that timezone here, once.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static FIXED_OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])(\d{2}):?(\d{2})$").expect("fixed offset pattern is valid")
});

static XMLTV_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{12}(?:\d{2})?)\s*([+-]\d{2}:?\d{2}|Z|UTC|GMT)?$")
        .expect("xmltv timestamp pattern is valid")
});

/// Errors that can occur while interpreting timestamps
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimeError {
    #[error("Invalid timestamp: '{input}'")]
    InvalidFormat { input: String },

    #[error("Invalid timezone: '{input}'. Use a named timezone (e.g. 'Asia/Jakarta') or UTC offset (e.g. '+07:00')")]
    InvalidTimezone { input: String },

    #[error("Local time does not exist or is ambiguous: {input}")]
    Ambiguous { input: String },
}

/// Parse timezone string and validate it
pub fn validate_timezone(tz_str: &str) -> Result<Tz, TimeError> {
    tz_str.parse::<Tz>().map_err(|_| TimeError::InvalidTimezone {
        input: tz_str.to_string(),
    })
}

/// Parse fixed offset formats like "+07:00", "+0700", "-0530"
pub fn parse_fixed_offset(offset_str: &str) -> Result<FixedOffset, TimeError> {
    let offset_str = offset_str.trim();
    let invalid = || TimeError::InvalidTimezone {
        input: offset_str.to_string(),
    };

    if matches!(offset_str, "Z" | "UTC" | "GMT") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let caps = FIXED_OFFSET.captures(offset_str).ok_or_else(invalid)?;
    let sign = if &caps[1] == "+" { 1 } else { -1 };
    let hours: i32 = caps[2].parse().map_err(|_| invalid())?;
    let minutes: i32 = caps[3].parse().map_err(|_| invalid())?;

    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Parse an XMLTV timestamp (`YYYYMMDDHHMM[SS] [+ZZZZ]`) into local time in `tz`
///
/// Timestamps with an offset are converted; timestamps without one are taken
/// to already be in `tz`.
pub fn parse_xmltv_timestamp(value: &str, tz: Tz) -> Result<NaiveDateTime, TimeError> {
    let trimmed = value.trim();
    let invalid = || TimeError::InvalidFormat {
        input: value.to_string(),
    };

    let caps = XMLTV_TIMESTAMP.captures(trimmed).ok_or_else(invalid)?;
    let digits = &caps[1];
    let naive = if digits.len() == 12 {
        NaiveDateTime::parse_from_str(&format!("{digits}00"), "%Y%m%d%H%M%S")
    } else {
        NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S")
    }
    .map_err(|_| invalid())?;

    match caps.get(2) {
        Some(offset) => {
            let offset = parse_fixed_offset(offset.as_str())?;
            let instant = offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(invalid)?;
            Ok(instant.with_timezone(&tz).naive_local())
        }
        None => Ok(naive),
    }
}

/// Current wall-clock time in `tz`
pub fn now_in(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

/// Parse a clock override such as `2025-12-23T20:00:00+07:00` or `2025-12-23 20:00`
///
/// Values with an offset are converted into `tz`; plain values are local time.
pub fn parse_clock_override(value: &str, tz: Tz) -> Result<NaiveDateTime, TimeError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&tz).naive_local());
    }

    let naive_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];

    for format in &naive_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            // reject wall times that a DST gap skips in `tz`
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.naive_local())
                .ok_or_else(|| TimeError::Ambiguous {
                    input: value.to_string(),
                });
        }
    }

    parse_xmltv_timestamp(trimmed, tz)
}
