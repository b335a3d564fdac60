//! One annotation run: resolve, classify, select, render
//!
//! The core stages are synchronous and take `now` explicitly, so a run with the
//! same inputs and the same clock always produces the same bytes. Only
//! [`Annotator::load_and_annotate`] touches the network or filesystem, and it
//! does so before the core starts.

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::{Config, SourcesConfig};
use crate::errors::{AppError, AppResult};
use crate::matching::{ChannelResolver, EpgKeyIndex, KeyNormalizer, ProgrammeClassifier};
use crate::models::{
    EpgDocument, LiveState, Playlist, PlaylistEntry, ProgrammeCategory, Resolution, RunDiagnostics,
};
use crate::output::PlaylistRenderer;
use crate::schedule::{EntryRoles, EventSelector, ProgrammeIndex, WindowClassifier};
use crate::sources::fetch::obfuscate_credentials;
use crate::sources::{DocumentKind, load_document, parse_epg, parse_playlist};
use crate::utils::now_in;

/// Result of a run
#[derive(Debug, Clone)]
pub struct Annotation {
    /// Rendered playlist text
    pub playlist: String,
    pub diagnostics: RunDiagnostics,
    /// The instant the run was evaluated at, in guide local time
    pub now: NaiveDateTime,
}

pub struct Annotator {
    timezone: Tz,
    classifier: ProgrammeClassifier,
    resolver: ChannelResolver,
    windows: WindowClassifier,
    selector: EventSelector,
    renderer: PlaylistRenderer,
}

impl Annotator {
    pub fn new(config: &Config) -> AppResult<Self> {
        config.validate()?;

        let normalizer = KeyNormalizer::new(&config.matching);
        Ok(Self {
            timezone: config.schedule.tz()?,
            classifier: ProgrammeClassifier::new(&config.classifier),
            resolver: ChannelResolver::new(&config.matching, normalizer.clone()),
            windows: WindowClassifier::new(&config.schedule, normalizer)?,
            selector: EventSelector::new(&config.selection),
            renderer: PlaylistRenderer::new(&config.render, &config.schedule.time_label),
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn classifier(&self) -> &ProgrammeClassifier {
        &self.classifier
    }

    /// Fetch both documents, then annotate; `now` defaults to the wall clock
    ///
    /// An empty `sources.epg` takes the guide location from the playlist
    /// header's `url-tvg`, which means the playlist has to be loaded first.
    pub async fn load_and_annotate(
        &self,
        sources: &SourcesConfig,
        now: Option<NaiveDateTime>,
    ) -> AppResult<Annotation> {
        let timeout = sources.fetch_timeout;
        info!("Loading playlist from {}", obfuscate_credentials(&sources.playlist));

        let (epg_location, guide, playlist) = if sources.epg.trim().is_empty() {
            let content = load_document(&sources.playlist, DocumentKind::Playlist, timeout).await?;
            let playlist = parse_playlist(&content);
            // url-tvg may list several guides; the first one is used
            let epg_location = playlist
                .header_epg_url
                .as_deref()
                .and_then(|urls| urls.split(',').map(str::trim).find(|url| !url.is_empty()))
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::configuration(
                        "sources.epg is empty and the playlist header announces no url-tvg",
                    )
                })?;
            info!("Loading guide from playlist header {}", obfuscate_credentials(&epg_location));
            let guide = load_document(&epg_location, DocumentKind::Guide, timeout).await?;
            (epg_location, guide, playlist)
        } else {
            info!("Loading guide from {}", obfuscate_credentials(&sources.epg));
            let (guide, content) = tokio::try_join!(
                load_document(&sources.epg, DocumentKind::Guide, timeout),
                load_document(&sources.playlist, DocumentKind::Playlist, timeout),
            )?;
            (sources.epg.clone(), guide, parse_playlist(&content))
        };

        let epg = parse_epg(&guide, self.timezone, &self.classifier)?;
        drop(guide);

        let now = now.unwrap_or_else(|| now_in(self.timezone));
        Ok(self.annotate(&playlist, &epg, &epg_location, now))
    }

    /// Run the core over already parsed inputs
    pub fn annotate(
        &self,
        playlist: &Playlist,
        epg: &EpgDocument,
        epg_source: &str,
        now: NaiveDateTime,
    ) -> Annotation {
        let normalizer = self.resolver.normalizer();
        let mut diagnostics = RunDiagnostics {
            malformed_entries: playlist.malformed.clone(),
            dropped_programmes: epg.dropped_programmes,
            excluded_programmes: epg
                .programmes
                .iter()
                .filter(|p| p.category == ProgrammeCategory::Excluded)
                .count(),
            ..RunDiagnostics::default()
        };

        let key_index = EpgKeyIndex::build(&epg.channels, normalizer);
        let programme_index = ProgrammeIndex::build(&epg.channels, &epg.programmes, normalizer);
        debug!(
            "Indexed {} guide channels, {} relevant programmes across {} channel ids",
            key_index.len(),
            programme_index.programme_count(),
            programme_index.channel_count()
        );

        let resolved = self.resolve_entries(&playlist.entries, &key_index, &mut diagnostics);

        let mut classified = Vec::new();
        for (entry, resolution) in &resolved {
            let programmes = programme_index.lookup(&resolution.channel_id, &self.resolver);
            let events = self.windows.classify(entry, &resolution.channel_id, programmes, now);
            classified.extend(events);
        }

        let mut events_by_state: BTreeMap<LiveState, usize> = BTreeMap::new();
        for event in &classified {
            *events_by_state.entry(event.state).or_default() += 1;
        }
        diagnostics.events_by_state = events_by_state;

        let roles = EntryRoles::compute(&playlist.entries, normalizer, &self.windows);
        let selected = self.selector.select(classified, &roles);
        diagnostics.emitted_entries = selected.len();

        let rendered = self.renderer.render(&selected, epg_source, now);

        info!(
            "Annotated {} of {} playlist entries ({} unmatched, {} malformed, {} programmes dropped)",
            diagnostics.emitted_entries,
            playlist.entries.len(),
            diagnostics.unmatched_channels.len(),
            diagnostics.malformed_entries.len(),
            diagnostics.dropped_programmes
        );
        for (tier, count) in &diagnostics.resolved_by_tier {
            info!("Resolved {} entries by {}", count, tier);
        }

        Annotation {
            playlist: rendered,
            diagnostics,
            now,
        }
    }

    fn resolve_entries<'a>(
        &self,
        entries: &'a [PlaylistEntry],
        key_index: &EpgKeyIndex,
        diagnostics: &mut RunDiagnostics,
    ) -> Vec<(&'a PlaylistEntry, Resolution)> {
        let mut resolved = Vec::with_capacity(entries.len());

        for entry in entries {
            match self.resolver.resolve(entry, key_index) {
                Some(resolution) => {
                    debug!(
                        "'{}' -> {} via {} (score {:.2})",
                        entry.display_name, resolution.channel_id, resolution.tier, resolution.score
                    );
                    *diagnostics.resolved_by_tier.entry(resolution.tier).or_default() += 1;
                    resolved.push((entry, resolution));
                }
                None => {
                    debug!("No guide channel for '{}'", entry.display_name);
                    diagnostics.unmatched_channels.push(entry.display_name.clone());
                }
            }
        }

        if !diagnostics.unmatched_channels.is_empty() {
            warn!(
                "{} playlist entries could not be matched to a guide channel",
                diagnostics.unmatched_channels.len()
            );
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EpgChannel;

    #[test]
    fn test_empty_inputs_render_only_header() {
        let annotator = Annotator::new(&Config::default()).unwrap();
        let now = chrono::NaiveDate::from_ymd_opt(2025, 12, 23)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();

        let annotation = annotator.annotate(
            &Playlist::default(),
            &EpgDocument {
                channels: vec![EpgChannel {
                    id: "ES1".to_string(),
                    display_name: "Example Sports One".to_string(),
                }],
                ..EpgDocument::default()
            },
            "guide.xml",
            now,
        );

        assert_eq!(annotation.playlist, "#EXTM3U url-tvg=\"guide.xml\"\n");
        assert_eq!(annotation.diagnostics.emitted_entries, 0);
        assert!(annotation.diagnostics.unmatched_channels.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.schedule.timezone = "Nowhere/Special".to_string();
        assert!(Annotator::new(&config).is_err());
    }

    #[test]
    fn test_unknown_date_specifier_is_rejected_before_rendering() {
        let mut config = Config::default();
        config.render.date_format = "%d %Q %Y".to_string();
        assert!(matches!(
            Annotator::new(&config),
            Err(AppError::Configuration { .. })
        ));
    }
}
