//! Data model shared by the annotation core and its collaborators.
//!
//! Parsed inputs ([`PlaylistEntry`], [`EpgChannel`], [`ProgrammeEvent`]) are
//! immutable once built. Derived records ([`Resolution`], [`ClassifiedEvent`])
//! borrow from them and only live for the duration of a single run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

use crate::errors::AppResult;

/// Relevance category assigned to a programme title.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProgrammeCategory {
    Match,
    Race,
    Excluded,
}

impl ProgrammeCategory {
    pub fn is_relevant(self) -> bool {
        !matches!(self, ProgrammeCategory::Excluded)
    }
}

/// Broadcast state of a programme relative to the run clock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LiveState {
    Live,
    Next,
    Expired,
}

/// Which resolver strategy produced a channel match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResolutionTier {
    Explicit,
    ExactKey,
    Alias,
    FamilyKey,
    Fuzzy,
}

/// One playlist record: the `#EXTINF` line plus the raw lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// Index of the entry in the source playlist
    pub position: usize,
    /// `tvg-name` if present, otherwise the trailing title
    pub display_name: String,
    /// The original attribute line, untouched
    pub raw_metadata_line: String,
    /// Lines after the attribute line up to and including the stream reference
    pub stream_block: Vec<String>,
    /// `tvg-id`, possibly a placeholder
    pub explicit_channel_id: Option<String>,
}

/// A playlist attribute line that never got a stream reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedEntry {
    pub line_number: usize,
    pub metadata_line: String,
    pub reason: String,
}

/// Parsed playlist: well-formed entries in order plus what had to be dropped.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    /// `url-tvg` / `x-tvg-url` announced by the playlist header, if any
    pub header_epg_url: Option<String>,
    pub entries: Vec<PlaylistEntry>,
    pub malformed: Vec<MalformedEntry>,
}

/// Channel record from the guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpgChannel {
    pub id: String,
    pub display_name: String,
}

/// Programme record from the guide, times in the guide's local civil time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammeEvent {
    pub channel_id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    pub category: ProgrammeCategory,
}

impl ProgrammeEvent {
    /// Build a programme, refusing inverted time ranges.
    pub fn new(
        channel_id: impl Into<String>,
        title: impl Into<String>,
        start: NaiveDateTime,
        stop: NaiveDateTime,
        category: ProgrammeCategory,
    ) -> Option<Self> {
        if stop < start {
            return None;
        }
        Some(Self {
            channel_id: channel_id.into(),
            title: title.into(),
            start,
            stop,
            category,
        })
    }
}

/// Parsed guide document.
#[derive(Debug, Clone, Default)]
pub struct EpgDocument {
    pub channels: Vec<EpgChannel>,
    pub programmes: Vec<ProgrammeEvent>,
    /// Programmes dropped for missing/unparsable times or `stop < start`
    pub dropped_programmes: usize,
}

/// Result of resolving a playlist entry against the guide.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub channel_id: String,
    pub tier: ResolutionTier,
    /// Similarity score for fuzzy matches, 1.0 otherwise
    pub score: f64,
}

/// A relevant programme tied to the playlist entry that will carry it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEvent<'a> {
    pub entry: &'a PlaylistEntry,
    pub channel_id: &'a str,
    pub programme: &'a ProgrammeEvent,
    pub state: LiveState,
    pub priority_override: bool,
}

/// Everything a run tolerated instead of failing on.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunDiagnostics {
    /// Display names of entries no resolver tier could match
    pub unmatched_channels: Vec<String>,
    pub malformed_entries: Vec<MalformedEntry>,
    pub dropped_programmes: usize,
    pub excluded_programmes: usize,
    pub resolved_by_tier: BTreeMap<ResolutionTier, usize>,
    pub events_by_state: BTreeMap<LiveState, usize>,
    pub emitted_entries: usize,
}

impl RunDiagnostics {
    /// Pretty JSON run report
    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
