//! Configuration default values
//!
//! This module contains all the default values for configuration options,
//! making them easily changeable in one central location.

// Source defaults
pub const DEFAULT_EPG_LOCATION: &str = "https://epg.pw/xmltv/epg.xml";
pub const DEFAULT_PLAYLIST_LOCATION: &str = "live_epg_sports.m3u";
pub const DEFAULT_OUTPUT_PATH: &str = "live_match.m3u";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;

// Matching defaults
pub const DEFAULT_FUZZY_CUTOFF: f64 = 0.6;

pub const DEFAULT_STOP_WORDS: &[&str] = &[
    // quality tags
    "hd", "fhd", "uhd", "sd", "4k", "8k", "hevc", "h265", "1080p", "720p",
    // region codes
    "id", "my", "sg", "th", "uk", "us", "au", "asia", "intl",
    // generic suffixes
    "channel", "tv", "backup", "raw",
];

pub const DEFAULT_ORDINAL_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("main", 1),
    ("first", 1),
    ("two", 2),
    ("second", 2),
    ("three", 3),
    ("third", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

pub const DEFAULT_POSITION_WORDS: &[&str] = &["event", "extra"];

// Classifier defaults
pub const DEFAULT_BLOCKED_KEYWORDS: &[&str] = &[
    "replay",
    "highlight",
    "review",
    "studio",
    "analysis",
    "magazine",
    "preview",
    "classic",
    "rerun",
    "re-run",
    "goals of the season",
    "netbusters",
    "the final",
    "build-up",
    "countdown",
    "press conference",
    "documentary",
    "delayed",
];

pub const DEFAULT_RACE_KEYWORDS: &[&str] = &[
    "race",
    "grand prix",
    "motogp",
    "moto2",
    "moto3",
    "formula",
    "f1",
    "nascar",
    "indycar",
    "superbike",
];

pub const DEFAULT_PAIRING_MARKERS: &[&str] = &[" vs ", " vs. ", " v ", " v. ", " - "];

pub const DEFAULT_KNOCKOUT_KEYWORDS: &[&str] = &[
    "final",
    "semi-final",
    "semifinal",
    "quarter-final",
    "quarterfinal",
    "playoff",
    "play-off",
    "round of 16",
];

// Schedule defaults
pub const DEFAULT_MATCH_DURATION_SECS: u64 = 5 * 3600;
pub const DEFAULT_RACE_DURATION_SECS: u64 = 4 * 3600;
pub const DEFAULT_EARLY_OFFSET_SECS: u64 = 30 * 60;
pub const DEFAULT_PRIORITY_GRACE_SECS: u64 = 3600;
pub const DEFAULT_NEXT_HORIZON_SECS: u64 = 12 * 3600;
pub const DEFAULT_PRIORITY_CHANNELS: &[&str] = &["bein sports", "astro supersport", "sky sports"];
pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";
pub const DEFAULT_TIME_LABEL: &str = "WIB";

// Render defaults
pub const DEFAULT_LIVE_GROUP_PREFIX: &str = "LIVE NOW";
pub const DEFAULT_NEXT_GROUP: &str = "NEXT LIVE";
pub const DEFAULT_LIVE_GLYPH: &str = "🔴 LIVE";
pub const DEFAULT_SEPARATOR: &str = " • ";
pub const DEFAULT_DATE_FORMAT: &str = "%d %B %Y";
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M";
