//! Playlist entry to guide channel resolution
//!
//! Resolution walks a fixed list of strategies, strongest first, and stops at
//! the first one that produces a channel id:
//!
//! 1. explicit `tvg-id` (purely numeric ids are upstream placeholders and skipped)
//! 2. exact normalized key
//! 3. configured alias rule
//! 4. family key, preferring the sibling with the same ordinal
//! 5. fuzzy similarity above the configured cutoff

use std::collections::{HashMap, HashSet};
use tracing::trace;

use crate::config::MatchingConfig;
use crate::matching::KeyNormalizer;
use crate::models::{EpgChannel, PlaylistEntry, Resolution, ResolutionTier};

const STRATEGIES: [ResolutionTier; 5] = [
    ResolutionTier::Explicit,
    ResolutionTier::ExactKey,
    ResolutionTier::Alias,
    ResolutionTier::FamilyKey,
    ResolutionTier::Fuzzy,
];

/// A family member as seen from the guide side
#[derive(Debug, Clone)]
struct FamilyMember {
    channel: usize,
    ordinal: u32,
}

/// Lookup tables over the guide's channels, built once per run
#[derive(Debug, Clone, Default)]
pub struct EpgKeyIndex {
    ids: Vec<String>,
    exact: HashMap<String, usize>,
    families: HashMap<String, Vec<FamilyMember>>,
    /// Every distinct key in guide order, for fuzzy scanning
    fuzzy_keys: Vec<(String, usize)>,
}

impl EpgKeyIndex {
    pub fn build(channels: &[EpgChannel], normalizer: &KeyNormalizer) -> Self {
        let mut index = Self {
            ids: channels.iter().map(|c| c.id.clone()).collect(),
            ..Self::default()
        };

        // Display names outrank ids for the same key; first channel wins within each pass
        let display_keys: Vec<String> = channels
            .iter()
            .map(|c| normalizer.normalize(&c.display_name))
            .collect();
        let id_keys: Vec<String> = channels.iter().map(|c| normalizer.normalize(&c.id)).collect();

        for (position, key) in display_keys.iter().chain(id_keys.iter()).enumerate() {
            if key.is_empty() {
                continue;
            }
            let channel = position % channels.len();
            index.exact.entry(key.clone()).or_insert(channel);
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(channels.len() * 2);
        for (channel, (display_key, id_key)) in display_keys.iter().zip(&id_keys).enumerate() {
            for key in [display_key, id_key] {
                if !key.is_empty() && seen.insert(key.as_str()) {
                    index.fuzzy_keys.push((key.clone(), channel));
                }
            }
        }

        for (channel, epg) in channels.iter().enumerate() {
            let family = normalizer.family_key(&epg.display_name);
            if family.is_empty() {
                continue;
            }
            index.families.entry(family).or_default().push(FamilyMember {
                channel,
                ordinal: normalizer.ordinal(&epg.display_name).unwrap_or(1),
            });
        }

        index
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn id(&self, channel: usize) -> &str {
        &self.ids[channel]
    }
}

#[derive(Debug, Clone)]
struct CompiledAlias {
    pattern: String,
    channel_id: String,
}

/// Maps playlist entries to guide channel ids
#[derive(Debug, Clone)]
pub struct ChannelResolver {
    normalizer: KeyNormalizer,
    aliases: Vec<CompiledAlias>,
    fuzzy_cutoff: f64,
}

impl ChannelResolver {
    pub fn new(config: &MatchingConfig, normalizer: KeyNormalizer) -> Self {
        let aliases = config
            .aliases
            .iter()
            .filter_map(|rule| {
                let pattern = normalizer.normalize(&rule.pattern);
                (!pattern.is_empty()).then(|| CompiledAlias {
                    pattern,
                    channel_id: rule.channel_id.trim().to_string(),
                })
            })
            .collect();

        Self {
            normalizer,
            aliases,
            fuzzy_cutoff: config.fuzzy_cutoff,
        }
    }

    pub fn normalizer(&self) -> &KeyNormalizer {
        &self.normalizer
    }

    /// Channel id an alias rule assigns to `name`, if any
    pub fn alias_target(&self, name: &str) -> Option<&str> {
        let key = self.normalizer.normalize(name);
        self.aliases
            .iter()
            .find(|alias| key.contains(&alias.pattern))
            .map(|alias| alias.channel_id.as_str())
    }

    pub fn resolve(&self, entry: &PlaylistEntry, index: &EpgKeyIndex) -> Option<Resolution> {
        let resolution = STRATEGIES
            .iter()
            .find_map(|tier| self.try_strategy(*tier, entry, index));

        trace!(
            "Resolved '{}' -> {:?}",
            entry.display_name,
            resolution.as_ref().map(|r| (&r.channel_id, r.tier))
        );
        resolution
    }

    fn try_strategy(
        &self,
        tier: ResolutionTier,
        entry: &PlaylistEntry,
        index: &EpgKeyIndex,
    ) -> Option<Resolution> {
        let exact = |channel_id: String| Resolution {
            channel_id,
            tier,
            score: 1.0,
        };

        match tier {
            ResolutionTier::Explicit => entry
                .explicit_channel_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty() && !id.bytes().all(|b| b.is_ascii_digit()))
                .map(|id| exact(id.to_string())),

            ResolutionTier::ExactKey => {
                let key = self.normalizer.normalize(&entry.display_name);
                index
                    .exact
                    .get(&key)
                    .map(|channel| exact(index.id(*channel).to_string()))
            }

            ResolutionTier::Alias => self
                .alias_target(&entry.display_name)
                .map(|channel_id| exact(channel_id.to_string())),

            ResolutionTier::FamilyKey => {
                let family = self.normalizer.family_key(&entry.display_name);
                let members = index.families.get(&family)?;
                let ordinal = self.normalizer.ordinal(&entry.display_name).unwrap_or(1);
                members
                    .iter()
                    .find(|member| member.ordinal == ordinal)
                    .or_else(|| members.first())
                    .map(|member| exact(index.id(member.channel).to_string()))
            }

            ResolutionTier::Fuzzy => {
                let key = self.normalizer.normalize(&entry.display_name);
                if key.is_empty() {
                    return None;
                }
                let mut best: Option<(f64, usize)> = None;
                for (candidate, channel) in &index.fuzzy_keys {
                    let score = strsim::normalized_levenshtein(&key, candidate);
                    if best.is_none_or(|(best_score, _)| score > best_score) {
                        best = Some((score, *channel));
                    }
                }
                best.filter(|(score, _)| *score >= self.fuzzy_cutoff)
                    .map(|(score, channel)| Resolution {
                        channel_id: index.id(channel).to_string(),
                        tier,
                        score,
                    })
            }
        }
    }
}
