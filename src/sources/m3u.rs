//! M3U playlist parsing
//!
//! Each `#EXTINF` line opens an entry. Every non-blank line after it, up to and
//! including the first line that is not a `#` directive, belongs to the entry's
//! stream block and is carried through untouched. An `#EXTINF` that is followed
//! by another `#EXTINF` or by the end of the file never got a stream and is
//! reported as malformed.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::{MalformedEntry, Playlist, PlaylistEntry};

const EXTM3U: &str = "#EXTM3U";
const EXTINF: &str = "#EXTINF";

/// Entry being assembled while its stream block is read
struct PendingEntry {
    line_number: usize,
    metadata_line: String,
    display_name: String,
    explicit_channel_id: Option<String>,
    stream_block: Vec<String>,
}

impl PendingEntry {
    fn open(line_number: usize, line: &str) -> Self {
        let (attributes_part, title) = split_title(line);
        let attributes = parse_attributes(attributes_part);

        let display_name = attributes
            .get("tvg-name")
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(title.trim())
            .to_string();

        Self {
            line_number,
            metadata_line: line.to_string(),
            display_name,
            explicit_channel_id: attributes.get("tvg-id").map(|id| id.trim().to_string()),
            stream_block: Vec::new(),
        }
    }

    fn into_malformed(self, reason: &str) -> MalformedEntry {
        warn!(
            "Dropping playlist entry '{}' at line {}: {}",
            self.display_name, self.line_number, reason
        );
        MalformedEntry {
            line_number: self.line_number,
            metadata_line: self.metadata_line,
            reason: reason.to_string(),
        }
    }
}

/// Parse playlist text; never fails, problems are reported in [`Playlist::malformed`]
pub fn parse_playlist(content: &str) -> Playlist {
    let mut playlist = Playlist::default();
    let mut pending: Option<PendingEntry> = None;

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with(EXTINF) {
            if let Some(previous) = pending.take() {
                playlist
                    .malformed
                    .push(previous.into_malformed("no stream reference before next #EXTINF"));
            }
            pending = Some(PendingEntry::open(line_number, line));
            continue;
        }

        let Some(entry) = pending.as_mut() else {
            if trimmed.starts_with(EXTM3U) {
                let attributes = parse_attributes(&trimmed[EXTM3U.len()..]);
                playlist.header_epg_url = attributes
                    .get("url-tvg")
                    .or_else(|| attributes.get("x-tvg-url"))
                    .cloned();
            } else if !trimmed.starts_with('#') {
                warn!(
                    "Ignoring stream reference without #EXTINF metadata at line {}: {}",
                    line_number, trimmed
                );
            }
            continue;
        };

        entry.stream_block.push(line.to_string());

        if !trimmed.starts_with('#') {
            if let Some(complete) = pending.take() {
                playlist.entries.push(PlaylistEntry {
                    position: playlist.entries.len(),
                    display_name: complete.display_name,
                    raw_metadata_line: complete.metadata_line,
                    stream_block: complete.stream_block,
                    explicit_channel_id: complete.explicit_channel_id,
                });
            }
        }
    }

    if let Some(unfinished) = pending {
        playlist
            .malformed
            .push(unfinished.into_malformed("no stream reference before end of playlist"));
    }

    debug!(
        "Parsed {} playlist entries ({} malformed)",
        playlist.entries.len(),
        playlist.malformed.len()
    );
    playlist
}

/// Byte offset of the comma separating attributes from the title, ignoring commas inside quotes
pub fn title_comma_position(line: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut last = None;
    for (offset, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => last = Some(offset),
            _ => {}
        }
    }
    last
}

/// Split an `#EXTINF` line into its attribute part and trailing title
pub fn split_title(line: &str) -> (&str, &str) {
    let body = line.trim_start().strip_prefix("#EXTINF:").unwrap_or(line);
    match title_comma_position(body) {
        Some(comma) => (&body[..comma], &body[comma + 1..]),
        None => (body, ""),
    }
}

/// Parse `key="value"` pairs (quoted or bare) from an attribute string
pub fn parse_attributes(attrs_part: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let mut chars = attrs_part.chars().peekable();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut in_quotes = false;

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_value && in_quotes => {
                attributes.insert(std::mem::take(&mut key), std::mem::take(&mut value));
                in_value = false;
                in_quotes = false;
            }
            _ if in_quotes => value.push(ch),
            '=' if !in_value && !key.is_empty() => {
                in_value = true;
                if chars.peek() == Some(&'"') {
                    chars.next();
                    in_quotes = true;
                }
            }
            ' ' | '\t' => {
                if in_value && !value.is_empty() {
                    attributes.insert(std::mem::take(&mut key), std::mem::take(&mut value));
                }
                key.clear();
                in_value = false;
            }
            _ if in_value => value.push(ch),
            _ => key.push(ch),
        }
    }

    if in_value && !key.is_empty() && !value.is_empty() {
        attributes.insert(key, value);
    }

    attributes
}
