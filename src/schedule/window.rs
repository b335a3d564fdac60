//! Live/next/expired classification against the run clock

use chrono::{Duration, NaiveDateTime};

use crate::config::ScheduleConfig;
use crate::errors::{AppError, AppResult};
use crate::matching::KeyNormalizer;
use crate::models::{
    ClassifiedEvent, LiveState, PlaylistEntry, ProgrammeCategory, ProgrammeEvent,
};

/// Where a programme sits relative to `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub state: LiveState,
    pub priority_override: bool,
}

#[derive(Debug, Clone)]
pub struct WindowClassifier {
    match_duration: Duration,
    race_duration: Duration,
    early_offset: Duration,
    priority_grace: Duration,
    next_horizon: Duration,
    priority_channels: Vec<String>,
    normalizer: KeyNormalizer,
}

fn to_chrono(name: &str, value: std::time::Duration) -> AppResult<Duration> {
    Duration::from_std(value)
        .map_err(|e| AppError::configuration(format!("schedule.{name} out of range: {e}")))
}

impl WindowClassifier {
    pub fn new(config: &ScheduleConfig, normalizer: KeyNormalizer) -> AppResult<Self> {
        let priority_channels = config
            .priority_channels
            .iter()
            .map(|name| normalizer.normalize(name))
            .filter(|key| !key.is_empty())
            .collect();

        Ok(Self {
            match_duration: to_chrono("match_duration", config.match_duration)?,
            race_duration: to_chrono("race_duration", config.race_duration)?,
            early_offset: to_chrono("early_offset", config.early_offset)?,
            priority_grace: to_chrono("priority_grace", config.priority_grace)?,
            next_horizon: to_chrono("next_horizon", config.next_horizon)?,
            priority_channels,
            normalizer,
        })
    }

    /// Nominal on-air length assumed for a category, regardless of the guide's stop time
    pub fn duration(&self, category: ProgrammeCategory) -> Duration {
        match category {
            ProgrammeCategory::Race => self.race_duration,
            ProgrammeCategory::Match | ProgrammeCategory::Excluded => self.match_duration,
        }
    }

    /// Whether an entry name is on the priority list
    pub fn is_priority(&self, display_name: &str) -> bool {
        let key = self.normalizer.normalize(display_name);
        self.priority_channels.iter().any(|p| key.contains(p.as_str()))
    }

    pub fn window(&self, programme: &ProgrammeEvent, now: NaiveDateTime, priority: bool) -> Window {
        let live_start = programme.start - self.early_offset;
        let live_end = programme.start + self.duration(programme.category);

        let state = if now < live_start {
            LiveState::Next
        } else if now <= live_end {
            LiveState::Live
        } else {
            LiveState::Expired
        };

        if state == LiveState::Expired && priority {
            let extended_end = live_end.max(programme.stop) + self.priority_grace;
            if now <= extended_end {
                return Window {
                    state: LiveState::Live,
                    priority_override: true,
                };
            }
        }

        Window {
            state,
            priority_override: false,
        }
    }

    /// Whether an upcoming programme starts close enough to `now` to be announced
    pub fn within_horizon(&self, programme: &ProgrammeEvent, now: NaiveDateTime) -> bool {
        programme.start <= now + self.next_horizon
    }

    /// Classify every programme of a resolved entry; expired ones are kept for the selector,
    /// upcoming ones beyond the next horizon are skipped
    pub fn classify<'a>(
        &self,
        entry: &'a PlaylistEntry,
        channel_id: &'a str,
        programmes: &[&'a ProgrammeEvent],
        now: NaiveDateTime,
    ) -> Vec<ClassifiedEvent<'a>> {
        let priority = self.is_priority(&entry.display_name);

        programmes
            .iter()
            .filter(|programme| programme.category.is_relevant())
            .filter_map(|&programme| {
                let window = self.window(programme, now, priority);
                if window.state == LiveState::Next && !self.within_horizon(programme, now) {
                    return None;
                }
                Some(ClassifiedEvent {
                    entry,
                    channel_id,
                    programme,
                    state: window.state,
                    priority_override: window.priority_override,
                })
            })
            .collect()
    }
}
