//! Annotated playlist rendering
//!
//! Only the attribute line of each chosen entry is rewritten. Stream blocks are
//! written back exactly as they were parsed.

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

use crate::config::RenderConfig;
use crate::models::{ClassifiedEvent, LiveState};
use crate::sources::m3u::title_comma_position;

static GROUP_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"group-title="[^"]*""#).expect("group-title pattern is valid"));

static TVG_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"tvg-id="[^"]*""#).expect("tvg-id pattern is valid"));

#[derive(Debug, Clone)]
pub struct PlaylistRenderer {
    config: RenderConfig,
    time_label: String,
}

impl PlaylistRenderer {
    pub fn new(config: &RenderConfig, time_label: &str) -> Self {
        Self {
            config: config.clone(),
            time_label: time_label.to_string(),
        }
    }

    /// Render the final playlist text for already selected and ordered events
    pub fn render(
        &self,
        events: &[ClassifiedEvent<'_>],
        epg_source: &str,
        now: NaiveDateTime,
    ) -> String {
        let mut out = format!("#EXTM3U url-tvg=\"{}\"\n", attribute_safe(epg_source));

        for event in events {
            out.push('\n');
            out.push_str(&self.rewrite_metadata(event, now));
            out.push('\n');
            for line in &event.entry.stream_block {
                out.push_str(line);
                out.push('\n');
            }
        }

        out
    }

    /// Group label an event is filed under
    pub fn group_label(&self, event: &ClassifiedEvent<'_>, now: NaiveDateTime) -> String {
        if let Some(group) = self.config.category_groups.get(&event.programme.category) {
            return group.clone();
        }
        match event.state {
            LiveState::Next => self.config.next_group.clone(),
            LiveState::Live | LiveState::Expired => {
                format!("{} {}", self.config.live_group_prefix, self.format_date(now))
            }
        }
    }

    /// Display title: "🔴 LIVE • 20:00 WIB • title", or the date in place of the glyph
    pub fn display_title(&self, event: &ClassifiedEvent<'_>) -> String {
        let start = event.programme.start;
        let time = format!("{} {}", start.format(&self.config.time_format), self.time_label);
        let lead = match event.state {
            LiveState::Next => self.format_date(start),
            LiveState::Live | LiveState::Expired => self.config.live_glyph.clone(),
        };

        [lead.as_str(), time.trim_end(), event.programme.title.as_str()]
            .join(self.config.separator.as_str())
    }

    pub fn rewrite_metadata(&self, event: &ClassifiedEvent<'_>, now: NaiveDateTime) -> String {
        let line = event.entry.raw_metadata_line.trim_end();
        let (attributes, _) = match title_comma_position(line) {
            Some(comma) => line.split_at(comma),
            None => (line, ""),
        };

        let group = format!("group-title=\"{}\"", attribute_safe(&self.group_label(event, now)));
        let mut attributes = set_attribute(attributes, &GROUP_TITLE, &group);

        if self.config.rewrite_tvg_id {
            let tvg_id = format!("tvg-id=\"{}\"", attribute_safe(event.channel_id));
            attributes = set_attribute(&attributes, &TVG_ID, &tvg_id);
        }

        format!("{attributes},{}", self.display_title(event))
    }

    fn format_date(&self, at: NaiveDateTime) -> String {
        let date = at.format(&self.config.date_format).to_string();
        if self.config.uppercase_dates {
            date.to_uppercase()
        } else {
            date
        }
    }
}

/// Replace an existing `key="..."` attribute or append it to the attribute part
fn set_attribute(attributes: &str, pattern: &Regex, replacement: &str) -> String {
    if pattern.is_match(attributes) {
        pattern
            .replace(attributes, regex::NoExpand(replacement))
            .into_owned()
    } else {
        format!("{} {replacement}", attributes.trim_end())
    }
}

fn attribute_safe(value: &str) -> String {
    value.replace('"', "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlaylistEntry, ProgrammeCategory, ProgrammeEvent};
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, 23)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    fn entry(metadata: &str) -> PlaylistEntry {
        PlaylistEntry {
            position: 0,
            display_name: "Example Sports 1".to_string(),
            raw_metadata_line: metadata.to_string(),
            stream_block: vec![
                "#EXTVLCOPT:http-user-agent=Mozilla/5.0".to_string(),
                "http://example.invalid/es1.m3u8".to_string(),
            ],
            explicit_channel_id: None,
        }
    }

    fn programme(offset_minutes: i64, category: ProgrammeCategory) -> ProgrammeEvent {
        let start = now() + Duration::minutes(offset_minutes);
        let stop = start + Duration::hours(2);
        ProgrammeEvent::new("ES1", "Team A vs Team B", start, stop, category).unwrap()
    }

    fn event<'a>(
        entry: &'a PlaylistEntry,
        programme: &'a ProgrammeEvent,
        state: LiveState,
    ) -> ClassifiedEvent<'a> {
        ClassifiedEvent {
            entry,
            channel_id: "ES1",
            programme,
            state,
            priority_override: false,
        }
    }

    fn renderer() -> PlaylistRenderer {
        PlaylistRenderer::new(&RenderConfig::default(), "WIB")
    }

    #[test]
    fn test_live_entry_replaces_group_and_title() {
        let entry = entry(r#"#EXTINF:-1 tvg-id="12345" group-title="Sports, All",ExampleSports 1"#);
        let programme = programme(10, ProgrammeCategory::Match);
        let line = renderer().rewrite_metadata(&event(&entry, &programme, LiveState::Live), now());

        assert_eq!(
            line,
            r#"#EXTINF:-1 tvg-id="12345" group-title="LIVE NOW 23 DECEMBER 2025",🔴 LIVE • 20:10 WIB • Team A vs Team B"#
        );
    }

    #[test]
    fn test_next_entry_inserts_missing_group() {
        let entry = entry("#EXTINF:-1 tvg-name=\"Example Sports 1\",Example Sports 1");
        let programme = programme(27 * 60, ProgrammeCategory::Match);
        let line = renderer().rewrite_metadata(&event(&entry, &programme, LiveState::Next), now());

        assert_eq!(
            line,
            "#EXTINF:-1 tvg-name=\"Example Sports 1\" group-title=\"NEXT LIVE\",24 DECEMBER 2025 • 23:00 WIB • Team A vs Team B"
        );
    }

    #[test]
    fn test_category_group_and_tvg_id_rewrite() {
        let mut config = RenderConfig::default();
        config.rewrite_tvg_id = true;
        config
            .category_groups
            .insert(ProgrammeCategory::Race, "MOTORSPORT".to_string());
        let renderer = PlaylistRenderer::new(&config, "WIB");

        let entry = entry(r#"#EXTINF:-1 tvg-id="12345",Example Sports 1"#);
        let programme = programme(0, ProgrammeCategory::Race);
        let line = renderer.rewrite_metadata(&event(&entry, &programme, LiveState::Live), now());

        assert!(line.starts_with(r#"#EXTINF:-1 tvg-id="ES1" group-title="MOTORSPORT","#));
    }

    #[test]
    fn test_render_keeps_stream_block_verbatim() {
        let entry = entry("#EXTINF:-1,Example Sports 1");
        let programme = programme(10, ProgrammeCategory::Match);
        let events = vec![event(&entry, &programme, LiveState::Live)];

        let rendered = renderer().render(&events, "https://epg.example/guide.xml", now());
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], r#"#EXTM3U url-tvg="https://epg.example/guide.xml""#);
        assert_eq!(lines[1], "");
        assert!(lines[2].starts_with("#EXTINF:-1 group-title=\"LIVE NOW 23 DECEMBER 2025\","));
        assert_eq!(&lines[3..], entry.stream_block.as_slice());
    }

    #[test]
    fn test_metadata_without_title_comma_gets_one() {
        let entry = entry("#EXTINF:-1");
        let programme = programme(10, ProgrammeCategory::Match);
        let line = renderer().rewrite_metadata(&event(&entry, &programme, LiveState::Live), now());
        assert!(line.starts_with("#EXTINF:-1 group-title="));
        assert!(line.ends_with(",🔴 LIVE • 20:10 WIB • Team A vs Team B"));
    }
}
