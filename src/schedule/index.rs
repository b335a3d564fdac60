//! Programme lookup by resolved channel id
//!
//! Guides are not always consistent about the ids their programmes reference,
//! so lookup mirrors the resolver's tiering on the programme side: exact id,
//! normalized id, alias target, then family key. The first tier that knows the
//! id wins, even when none of its programmes are relevant; the family tier is
//! only consulted for ids the guide never mentions.

use std::collections::HashMap;

use crate::matching::{ChannelResolver, KeyNormalizer};
use crate::models::{EpgChannel, ProgrammeEvent};

#[derive(Debug, Default)]
pub struct ProgrammeIndex<'a> {
    by_id: HashMap<&'a str, Vec<&'a ProgrammeEvent>>,
    by_key: HashMap<String, Vec<&'a ProgrammeEvent>>,
    by_family: HashMap<String, Vec<&'a ProgrammeEvent>>,
}

impl<'a> ProgrammeIndex<'a> {
    /// Index relevant programmes; excluded titles never enter the index but
    /// still make their channel id known
    pub fn build(
        channels: &'a [EpgChannel],
        programmes: &'a [ProgrammeEvent],
        normalizer: &KeyNormalizer,
    ) -> Self {
        let mut index = Self::default();

        for channel in channels {
            index.known_id(&channel.id, normalizer);
        }

        for programme in programmes {
            let key = index.known_id(&programme.channel_id, normalizer);
            if !programme.category.is_relevant() {
                continue;
            }

            if let Some(found) = index.by_id.get_mut(programme.channel_id.as_str()) {
                found.push(programme);
            }
            if let Some(found) = key.and_then(|key| index.by_key.get_mut(&key)) {
                found.push(programme);
            }

            let family = normalizer.family_key(&programme.channel_id);
            if !family.is_empty() {
                index.by_family.entry(family).or_default().push(programme);
            }
        }

        index
    }

    /// Register `id` with the exact and normalized tiers, returning its normalized key
    fn known_id(&mut self, id: &'a str, normalizer: &KeyNormalizer) -> Option<String> {
        self.by_id.entry(id).or_default();

        let key = normalizer.normalize(id);
        if key.is_empty() {
            return None;
        }
        self.by_key.entry(key.clone()).or_default();
        Some(key)
    }

    /// Channel ids known from the guide's channels and programmes
    pub fn channel_count(&self) -> usize {
        self.by_id.len()
    }

    pub fn programme_count(&self) -> usize {
        self.by_id.values().map(Vec::len).sum()
    }

    /// Relevant programmes for `channel_id`, in guide order; empty when the
    /// guide knows the channel but has nothing relevant on it
    pub fn lookup(&self, channel_id: &str, resolver: &ChannelResolver) -> &[&'a ProgrammeEvent] {
        let normalizer = resolver.normalizer();

        if let Some(found) = self.by_id.get(channel_id) {
            return found;
        }

        let key = normalizer.normalize(channel_id);
        if let Some(found) = self.by_key.get(&key) {
            return found;
        }

        if let Some(target) = resolver.alias_target(channel_id) {
            let found = self
                .by_id
                .get(target)
                .or_else(|| self.by_key.get(&normalizer.normalize(target)));
            if let Some(found) = found {
                return found;
            }
        }

        self.by_family
            .get(&normalizer.family_key(channel_id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
