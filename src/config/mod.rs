use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::{Display, EnumString};
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::errors::{AppError, AppResult};
use crate::models::ProgrammeCategory;
use defaults::*;

/// Title rule names usable in the classifier precedence list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TitleRule {
    Blocked,
    Race,
    Match,
}

/// What to do with knockout-stage titles ("Final") that carry no pairing marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KnockoutPolicy {
    #[default]
    Exclude,
    Match,
}

/// How many output entries a resolved channel may produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SelectionMode {
    #[default]
    OnePerChannel,
    ManyPerChannel,
}

/// Tie-breaker applied after event start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SecondarySort {
    #[default]
    Category,
    ChannelName,
    PlaylistOrder,
}

/// Brand alias: any entry whose normalized name contains `pattern` maps to `channel_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    pub pattern: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Guide location, http(s) URL or local path (gzip is detected);
    /// empty to use the `url-tvg` announced by the playlist header
    #[serde(default = "default_epg_location")]
    pub epg: String,
    /// Playlist location, http(s) URL or local path
    #[serde(default = "default_playlist_location")]
    pub playlist: String,
    #[serde(default = "default_output_path")]
    pub output: PathBuf,
    /// Where to write unmatched channel names, one per line
    #[serde(default)]
    pub unmatched_output: Option<PathBuf>,
    /// Where to write the JSON run report
    #[serde(default)]
    pub report_output: Option<PathBuf>,
    #[serde(default = "default_fetch_timeout", with = "duration_serde::duration")]
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
    /// Words naming a position in a numbered family, with their value
    #[serde(default = "default_ordinal_words")]
    pub ordinal_words: BTreeMap<String, u32>,
    /// Position words without a numeric value, stripped from family keys
    #[serde(default = "default_position_words")]
    pub position_words: Vec<String>,
    /// Minimum similarity (0.0-1.0) for the fuzzy tier
    #[serde(default = "default_fuzzy_cutoff")]
    pub fuzzy_cutoff: f64,
    #[serde(default)]
    pub aliases: Vec<AliasRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_blocked_keywords")]
    pub blocked_keywords: Vec<String>,
    #[serde(default = "default_race_keywords")]
    pub race_keywords: Vec<String>,
    #[serde(default = "default_pairing_markers")]
    pub pairing_markers: Vec<String>,
    #[serde(default = "default_knockout_keywords")]
    pub knockout_keywords: Vec<String>,
    #[serde(default = "default_precedence")]
    pub precedence: Vec<TitleRule>,
    #[serde(default)]
    pub knockout_without_pairing: KnockoutPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_match_duration", with = "duration_serde::duration")]
    pub match_duration: Duration,
    #[serde(default = "default_race_duration", with = "duration_serde::duration")]
    pub race_duration: Duration,
    /// How long before kick-off an event already counts as live
    #[serde(default = "default_early_offset", with = "duration_serde::duration")]
    pub early_offset: Duration,
    /// Channel names that are kept past nominal expiry
    #[serde(default = "default_priority_channels")]
    pub priority_channels: Vec<String>,
    /// How far past `max(live_end, stop)` a priority channel stays live
    #[serde(default = "default_priority_grace", with = "duration_serde::duration")]
    pub priority_grace: Duration,
    /// Upcoming events starting later than this are not shown as next
    #[serde(default = "default_next_horizon", with = "duration_serde::duration")]
    pub next_horizon: Duration,
    /// Guide civil timezone; offsets in the guide are converted into it
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Suffix printed after times, e.g. "WIB"
    #[serde(default = "default_time_label")]
    pub time_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub mode: SelectionMode,
    #[serde(default)]
    pub secondary_sort: SecondarySort,
    /// Category priority used by the `category` secondary sort
    #[serde(default = "default_category_order")]
    pub category_order: Vec<ProgrammeCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_live_group_prefix")]
    pub live_group_prefix: String,
    #[serde(default = "default_next_group")]
    pub next_group: String,
    /// Group names overriding the live label for specific categories
    #[serde(default)]
    pub category_groups: BTreeMap<ProgrammeCategory, String>,
    #[serde(default = "default_live_glyph")]
    pub live_glyph: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// Print dates as "23 DECEMBER 2025"
    #[serde(default = "default_true")]
    pub uppercase_dates: bool,
    /// Set `tvg-id` to the resolved guide channel id
    #[serde(default)]
    pub rewrite_tvg_id: bool,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// Source defaults
fn default_epg_location() -> String {
    DEFAULT_EPG_LOCATION.to_string()
}

fn default_playlist_location() -> String {
    DEFAULT_PLAYLIST_LOCATION.to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)
}

// Matching defaults
fn default_stop_words() -> Vec<String> {
    strings(DEFAULT_STOP_WORDS)
}

fn default_ordinal_words() -> BTreeMap<String, u32> {
    DEFAULT_ORDINAL_WORDS
        .iter()
        .map(|(word, value)| (word.to_string(), *value))
        .collect()
}

fn default_position_words() -> Vec<String> {
    strings(DEFAULT_POSITION_WORDS)
}

fn default_fuzzy_cutoff() -> f64 {
    DEFAULT_FUZZY_CUTOFF
}

// Classifier defaults
fn default_blocked_keywords() -> Vec<String> {
    strings(DEFAULT_BLOCKED_KEYWORDS)
}

fn default_race_keywords() -> Vec<String> {
    strings(DEFAULT_RACE_KEYWORDS)
}

fn default_pairing_markers() -> Vec<String> {
    strings(DEFAULT_PAIRING_MARKERS)
}

fn default_knockout_keywords() -> Vec<String> {
    strings(DEFAULT_KNOCKOUT_KEYWORDS)
}

fn default_precedence() -> Vec<TitleRule> {
    vec![TitleRule::Blocked, TitleRule::Race, TitleRule::Match]
}

// Schedule defaults
fn default_match_duration() -> Duration {
    Duration::from_secs(DEFAULT_MATCH_DURATION_SECS)
}

fn default_race_duration() -> Duration {
    Duration::from_secs(DEFAULT_RACE_DURATION_SECS)
}

fn default_early_offset() -> Duration {
    Duration::from_secs(DEFAULT_EARLY_OFFSET_SECS)
}

fn default_priority_channels() -> Vec<String> {
    strings(DEFAULT_PRIORITY_CHANNELS)
}

fn default_priority_grace() -> Duration {
    Duration::from_secs(DEFAULT_PRIORITY_GRACE_SECS)
}

fn default_next_horizon() -> Duration {
    Duration::from_secs(DEFAULT_NEXT_HORIZON_SECS)
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_time_label() -> String {
    DEFAULT_TIME_LABEL.to_string()
}

// Selection defaults
fn default_category_order() -> Vec<ProgrammeCategory> {
    vec![ProgrammeCategory::Match, ProgrammeCategory::Race]
}

// Render defaults
fn default_live_group_prefix() -> String {
    DEFAULT_LIVE_GROUP_PREFIX.to_string()
}

fn default_next_group() -> String {
    DEFAULT_NEXT_GROUP.to_string()
}

fn default_live_glyph() -> String {
    DEFAULT_LIVE_GLYPH.to_string()
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            epg: default_epg_location(),
            playlist: default_playlist_location(),
            output: default_output_path(),
            unmatched_output: None,
            report_output: None,
            fetch_timeout: default_fetch_timeout(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            stop_words: default_stop_words(),
            ordinal_words: default_ordinal_words(),
            position_words: default_position_words(),
            fuzzy_cutoff: default_fuzzy_cutoff(),
            aliases: Vec::new(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            blocked_keywords: default_blocked_keywords(),
            race_keywords: default_race_keywords(),
            pairing_markers: default_pairing_markers(),
            knockout_keywords: default_knockout_keywords(),
            precedence: default_precedence(),
            knockout_without_pairing: KnockoutPolicy::default(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            match_duration: default_match_duration(),
            race_duration: default_race_duration(),
            early_offset: default_early_offset(),
            priority_channels: default_priority_channels(),
            priority_grace: default_priority_grace(),
            next_horizon: default_next_horizon(),
            timezone: default_timezone(),
            time_label: default_time_label(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::default(),
            secondary_sort: SecondarySort::default(),
            category_order: default_category_order(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            live_group_prefix: default_live_group_prefix(),
            next_group: default_next_group(),
            category_groups: BTreeMap::new(),
            live_glyph: default_live_glyph(),
            separator: default_separator(),
            date_format: default_date_format(),
            time_format: default_time_format(),
            uppercase_dates: true,
            rewrite_tvg_id: false,
        }
    }
}

impl ScheduleConfig {
    /// Parsed guide timezone
    pub fn tz(&self) -> AppResult<chrono_tz::Tz> {
        crate::utils::validate_timezone(&self.timezone)
            .map_err(|e| AppError::configuration(e.to_string()))
    }
}

impl Config {
    /// Config path from `EPG_LIVE_CONFIG`, else `config.toml`
    pub fn default_path() -> String {
        std::env::var("EPG_LIVE_CONFIG").unwrap_or_else(|_| "config.toml".to_string())
    }

    /// Load a TOML config, writing the defaults out when the file does not exist yet
    pub fn load_from_file(config_file: &str) -> AppResult<Self> {
        Self::load_from_file_with(config_file, true)
    }

    /// Load a TOML config; a missing file yields defaults, written out if `write_default`
    pub fn load_from_file_with(config_file: &str, write_default: bool) -> AppResult<Self> {
        let config = if Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str(&contents).map_err(|e| {
                AppError::configuration(format!("Failed to parse {config_file}: {e}"))
            })?
        } else {
            let default_config = Self::default();
            if write_default {
                let contents = toml::to_string_pretty(&default_config).map_err(|e| {
                    AppError::configuration(format!("Failed to serialize default config: {e}"))
                })?;
                std::fs::write(config_file, contents)?;
                info!("Created default config file: {}", config_file);
            } else {
                info!("No config file at {}, using defaults", config_file);
            }
            default_config
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the core cannot work with
    pub fn validate(&self) -> AppResult<()> {
        let cutoff = self.matching.fuzzy_cutoff;
        if !(0.0..=1.0).contains(&cutoff) {
            return Err(AppError::configuration(format!(
                "matching.fuzzy_cutoff must be within 0.0..=1.0, got {cutoff}"
            )));
        }

        if self.classifier.precedence.is_empty() {
            return Err(AppError::configuration(
                "classifier.precedence must name at least one rule",
            ));
        }

        for (name, value) in [
            ("schedule.match_duration", self.schedule.match_duration),
            ("schedule.race_duration", self.schedule.race_duration),
            ("schedule.next_horizon", self.schedule.next_horizon),
        ] {
            if value.is_zero() {
                return Err(AppError::configuration(format!("{name} must be non-zero")));
            }
        }

        for (name, value) in [
            ("schedule.match_duration", self.schedule.match_duration),
            ("schedule.race_duration", self.schedule.race_duration),
            ("schedule.early_offset", self.schedule.early_offset),
            ("schedule.priority_grace", self.schedule.priority_grace),
            ("schedule.next_horizon", self.schedule.next_horizon),
        ] {
            // a week is far beyond any broadcast window
            if value > Duration::from_secs(7 * 24 * 3600) {
                return Err(AppError::configuration(format!(
                    "{name} is unreasonably large: {}",
                    humantime::format_duration(value)
                )));
            }
        }

        self.schedule.tz()?;

        for (name, format) in [
            ("render.date_format", &self.render.date_format),
            ("render.time_format", &self.render.time_format),
        ] {
            let invalid = StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
            if invalid {
                return Err(AppError::configuration(format!(
                    "{name} is not a valid strftime format: {format:?}"
                )));
            }
        }

        if let Some(rule) = self
            .matching
            .aliases
            .iter()
            .find(|rule| rule.pattern.trim().is_empty() || rule.channel_id.trim().is_empty())
        {
            return Err(AppError::configuration(format!(
                "alias rules need both a pattern and a channel_id: {rule:?}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [schedule]
            match_duration = "3h"
            timezone = "Europe/London"

            [selection]
            mode = "many-per-channel"

            [[matching.aliases]]
            pattern = "spotv"
            channel_id = "SPOTV.id"
            "#,
        )
        .unwrap();

        assert_eq!(config.schedule.match_duration, Duration::from_secs(3 * 3600));
        assert_eq!(config.schedule.race_duration, Duration::from_secs(4 * 3600));
        assert_eq!(config.schedule.early_offset, Duration::from_secs(30 * 60));
        assert_eq!(config.schedule.next_horizon, Duration::from_secs(12 * 3600));
        assert_eq!(config.selection.mode, SelectionMode::ManyPerChannel);
        assert_eq!(config.matching.aliases.len(), 1);
        assert_eq!(config.matching.fuzzy_cutoff, 0.6);
        assert_eq!(
            config.classifier.precedence,
            vec![TitleRule::Blocked, TitleRule::Race, TitleRule::Match]
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_cutoff_rejected() {
        let mut config = Config::default();
        config.matching.fuzzy_cutoff = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let mut config = Config::default();
        config.schedule.timezone = "Mars/Olympus".to_string();
        assert!(matches!(config.validate(), Err(AppError::Configuration { .. })));
    }

    #[rstest]
    #[case::unknown_date_specifier("%d %Q %Y", "%H:%M")]
    #[case::dangling_percent_in_time("%d %B %Y", "%H:%")]
    fn test_invalid_render_formats_rejected(
        #[case] date_format: &str,
        #[case] time_format: &str,
    ) {
        let mut config = Config::default();
        config.render.date_format = date_format.to_string();
        config.render.time_format = time_format.to_string();
        assert!(matches!(config.validate(), Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_zero_next_horizon_rejected() {
        let mut config = Config::default();
        config.schedule.next_horizon = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_category_groups_accept_category_keys() {
        let config: Config = toml::from_str(
            r#"
            [render.category_groups]
            race = "MOTORSPORT LIVE"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.render.category_groups.get(&ProgrammeCategory::Race).map(String::as_str),
            Some("MOTORSPORT LIVE")
        );
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let config = Config::load_from_file(path).unwrap();
        assert_eq!(config.schedule.timezone, "Asia/Jakarta");

        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("[schedule]"));
        assert!(written.contains("match_duration = \"5h\""));

        // second load reads the file back
        let reloaded = Config::load_from_file(path).unwrap();
        assert_eq!(reloaded.sources.output, config.sources.output);
    }

    #[test]
    fn test_missing_file_without_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::load_from_file_with(path.to_str().unwrap(), false).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_unparsable_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[schedule\nmatch_duration = ").unwrap();

        let result = Config::load_from_file(path.to_str().unwrap());
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let rendered = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.schedule.match_duration, Duration::from_secs(5 * 3600));
        assert_eq!(parsed.render.next_group, "NEXT LIVE");
    }
}
