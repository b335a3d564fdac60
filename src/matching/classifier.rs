//! Programme title classification
//!
//! Titles are tagged by keyword taxonomy. Rules are evaluated in the configured
//! precedence order and the first rule that fires decides the category.

use crate::config::{ClassifierConfig, KnockoutPolicy, TitleRule};
use crate::models::ProgrammeCategory;

#[derive(Debug, Clone)]
pub struct ProgrammeClassifier {
    blocked: Vec<String>,
    race: Vec<String>,
    pairing_markers: Vec<String>,
    knockout: Vec<String>,
    precedence: Vec<TitleRule>,
    knockout_without_pairing: KnockoutPolicy,
}

impl ProgrammeClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let lowered = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|w| w.to_lowercase())
                .filter(|w| !w.trim().is_empty())
                .collect()
        };

        Self {
            blocked: lowered(&config.blocked_keywords),
            race: lowered(&config.race_keywords),
            // markers carry their own surrounding spaces; keep them intact
            pairing_markers: config
                .pairing_markers
                .iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
            knockout: lowered(&config.knockout_keywords),
            precedence: config.precedence.clone(),
            knockout_without_pairing: config.knockout_without_pairing,
        }
    }

    pub fn classify(&self, title: &str) -> ProgrammeCategory {
        let padded = format!(" {} ", title.trim().to_lowercase());

        for rule in &self.precedence {
            let verdict = match rule {
                TitleRule::Blocked => contains_any(&padded, &self.blocked)
                    .then_some(ProgrammeCategory::Excluded),
                TitleRule::Race => {
                    contains_any(&padded, &self.race).then_some(ProgrammeCategory::Race)
                }
                TitleRule::Match => self.is_match(&padded).then_some(ProgrammeCategory::Match),
            };
            if let Some(category) = verdict {
                return category;
            }
        }

        ProgrammeCategory::Excluded
    }

    fn is_match(&self, padded: &str) -> bool {
        if contains_any(padded, &self.pairing_markers) {
            return true;
        }
        match self.knockout_without_pairing {
            KnockoutPolicy::Match => contains_any(padded, &self.knockout),
            KnockoutPolicy::Exclude => false,
        }
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}
