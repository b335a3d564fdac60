//! Final event selection and ordering

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::config::{SecondarySort, SelectionConfig, SelectionMode};
use crate::matching::KeyNormalizer;
use crate::models::{ClassifiedEvent, LiveState, PlaylistEntry, ProgrammeCategory};
use crate::schedule::WindowClassifier;

/// Per-entry flags the selector needs beyond the events themselves
#[derive(Debug, Clone, Default)]
pub struct EntryRoles {
    primary: HashSet<usize>,
    priority: HashSet<usize>,
}

impl EntryRoles {
    /// An entry is primary when it has the lowest ordinal of its family in the
    /// playlist (no ordinal counts as 1, ties go to the earlier entry).
    pub fn compute(
        entries: &[PlaylistEntry],
        normalizer: &KeyNormalizer,
        windows: &WindowClassifier,
    ) -> Self {
        let mut best: HashMap<String, (u32, usize)> = HashMap::new();
        for entry in entries {
            let family = normalizer.family_key(&entry.display_name);
            let ordinal = normalizer.ordinal(&entry.display_name).unwrap_or(1);
            best.entry(family)
                .and_modify(|current| {
                    if ordinal < current.0 {
                        *current = (ordinal, entry.position);
                    }
                })
                .or_insert((ordinal, entry.position));
        }

        Self {
            primary: best.into_values().map(|(_, position)| position).collect(),
            priority: entries
                .iter()
                .filter(|entry| windows.is_priority(&entry.display_name))
                .map(|entry| entry.position)
                .collect(),
        }
    }

    pub fn is_primary(&self, position: usize) -> bool {
        self.primary.contains(&position)
    }

    pub fn is_priority(&self, position: usize) -> bool {
        self.priority.contains(&position)
    }
}

#[derive(Debug, Clone)]
pub struct EventSelector {
    mode: SelectionMode,
    secondary_sort: SecondarySort,
    category_order: Vec<ProgrammeCategory>,
}

impl EventSelector {
    pub fn new(config: &SelectionConfig) -> Self {
        Self {
            mode: config.mode,
            secondary_sort: config.secondary_sort,
            category_order: config.category_order.clone(),
        }
    }

    /// Pick the events that make it into the output, in output order
    pub fn select<'a>(
        &self,
        classified: Vec<ClassifiedEvent<'a>>,
        roles: &EntryRoles,
    ) -> Vec<ClassifiedEvent<'a>> {
        let mut selected = match self.mode {
            SelectionMode::OnePerChannel => Self::one_per_channel(classified, roles),
            SelectionMode::ManyPerChannel => classified
                .into_iter()
                .filter(|event| event.state != LiveState::Expired)
                .collect(),
        };

        selected.sort_by(|a, b| self.compare(a, b));
        selected
    }

    fn one_per_channel<'a>(
        classified: Vec<ClassifiedEvent<'a>>,
        roles: &EntryRoles,
    ) -> Vec<ClassifiedEvent<'a>> {
        // group by channel, keeping first-seen channel order
        let mut channel_order: Vec<&'a str> = Vec::new();
        let mut groups: HashMap<&'a str, Vec<ClassifiedEvent<'a>>> = HashMap::new();
        for event in classified {
            let group = groups.entry(event.channel_id).or_insert_with(|| {
                channel_order.push(event.channel_id);
                Vec::new()
            });
            group.push(event);
        }

        let mut selected = Vec::new();
        for channel_id in channel_order {
            let Some(events) = groups.remove(channel_id) else {
                continue;
            };

            let Some(representative) = Self::representative(&events, roles) else {
                continue;
            };

            let candidates = || {
                events
                    .iter()
                    .filter(move |event| event.entry.position == representative)
            };

            let live = candidates()
                .filter(|event| event.state == LiveState::Live)
                .min_by_key(|event| event.programme.start);

            let chosen = live.or_else(|| {
                let may_show_next =
                    roles.is_primary(representative) || roles.is_priority(representative);
                may_show_next
                    .then(|| {
                        candidates()
                            .filter(|event| event.state == LiveState::Next)
                            .min_by_key(|event| event.programme.start)
                    })
                    .flatten()
            });

            if let Some(event) = chosen {
                selected.push(event.clone());
            }
        }

        selected
    }

    /// First primary entry of a channel group in playlist order, else the first entry
    fn representative(events: &[ClassifiedEvent<'_>], roles: &EntryRoles) -> Option<usize> {
        let mut positions: Vec<usize> = events.iter().map(|e| e.entry.position).collect();
        positions.sort_unstable();
        positions.dedup();

        positions
            .iter()
            .copied()
            .find(|position| roles.is_primary(*position))
            .or_else(|| positions.first().copied())
    }

    fn category_rank(&self, category: ProgrammeCategory) -> usize {
        self.category_order
            .iter()
            .position(|c| *c == category)
            .unwrap_or(self.category_order.len())
    }

    fn compare(&self, a: &ClassifiedEvent<'_>, b: &ClassifiedEvent<'_>) -> Ordering {
        let secondary = match self.secondary_sort {
            SecondarySort::Category => self
                .category_rank(a.programme.category)
                .cmp(&self.category_rank(b.programme.category)),
            SecondarySort::ChannelName => a
                .entry
                .display_name
                .to_lowercase()
                .cmp(&b.entry.display_name.to_lowercase()),
            SecondarySort::PlaylistOrder => a.entry.position.cmp(&b.entry.position),
        };

        a.programme
            .start
            .cmp(&b.programme.start)
            .then(secondary)
            .then_with(|| a.entry.position.cmp(&b.entry.position))
            .then_with(|| a.programme.title.cmp(&b.programme.title))
    }
}
