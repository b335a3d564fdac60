//! Canonical comparison keys for channel names
//!
//! Playlist and guide names for the same channel rarely agree on spacing,
//! case, quality tags or region suffixes. Everything that compares names goes
//! through [`KeyNormalizer`] so both sides are reduced the same way.

use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::config::MatchingConfig;

/// Longest digit run still read as an ordinal ("2", "10"), not a year or resolution
const MAX_ORDINAL_DIGITS: usize = 2;

/// Shortest word a glued digit suffix may be split from ("sports1" yes, "f1" no)
const MIN_GLUED_STEM: usize = 2;

#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    stop_words: HashSet<String>,
    ordinal_words: HashMap<String, u32>,
    position_words: HashSet<String>,
}

impl KeyNormalizer {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            ordinal_words: config
                .ordinal_words
                .iter()
                .map(|(word, value)| (word.to_lowercase(), *value))
                .collect(),
            position_words: config
                .position_words
                .iter()
                .map(|w| w.to_lowercase())
                .collect(),
        }
    }

    /// Identity key: lowercase ASCII alphanumerics with stop words removed
    pub fn normalize(&self, name: &str) -> String {
        let tokens = tokenize(name);
        let kept: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|token| !self.stop_words.contains(*token))
            .collect();

        if kept.is_empty() {
            tokens.concat()
        } else {
            kept.concat()
        }
    }

    /// Sibling key: [`normalize`](Self::normalize) minus ordinal and position qualifiers
    ///
    /// "beIN Sports 1 HD", "beIN Sports 2" and "bein sports main" share a family key.
    pub fn family_key(&self, name: &str) -> String {
        let family: String = tokenize(name)
            .iter()
            .filter(|token| !self.stop_words.contains(token.as_str()))
            .filter(|token| !self.ordinal_words.contains_key(token.as_str()))
            .filter(|token| !self.position_words.contains(token.as_str()))
            .filter(|token| !token.bytes().all(|b| b.is_ascii_digit()))
            .map(|token| split_glued_digits(token).0)
            .collect();

        if family.is_empty() {
            self.normalize(name)
        } else {
            family
        }
    }

    /// Position within a numbered family, taken from the last ordinal token
    pub fn ordinal(&self, name: &str) -> Option<u32> {
        tokenize(name)
            .iter()
            .filter_map(|token| self.token_ordinal(token))
            .last()
    }

    fn token_ordinal(&self, token: &str) -> Option<u32> {
        if let Some(value) = self.ordinal_words.get(token) {
            return Some(*value);
        }
        if token.bytes().all(|b| b.is_ascii_digit()) {
            return parse_ordinal_digits(token);
        }
        match split_glued_digits(token) {
            (_, Some(digits)) => parse_ordinal_digits(digits),
            _ => None,
        }
    }
}

/// Compatibility-decompose, drop diacritics, lowercase, split on anything outside `[a-z0-9]`
fn tokenize(name: &str) -> Vec<String> {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();

    folded
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split "sports1" into ("sports", Some("1")); tokens that don't qualify come back whole
fn split_glued_digits(token: &str) -> (&str, Option<&str>) {
    let stem_len = token.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if stem_len < MIN_GLUED_STEM || stem_len == token.len() {
        return (token, None);
    }
    let (stem, digits) = token.split_at(stem_len);
    if stem.bytes().all(|b| b.is_ascii_alphabetic()) && digits.len() <= MAX_ORDINAL_DIGITS {
        (stem, Some(digits))
    } else {
        (token, None)
    }
}

fn parse_ordinal_digits(digits: &str) -> Option<u32> {
    if digits.len() > MAX_ORDINAL_DIGITS {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn normalizer() -> KeyNormalizer {
        KeyNormalizer::new(&MatchingConfig::default())
    }

    #[rstest]
    #[case("Example Sports One", "examplesportsone")]
    #[case("beIN Sports 1 HD", "beinsports1")]
    #[case("Astro SuperSport (Asia) FHD", "astrosupersport")]
    #[case("Télé Sport", "telesport")]
    #[case("ＳＰＯＴＶ２", "spotv2")]
    #[case("HD TV", "hdtv")]
    #[case("", "")]
    #[case("---", "")]
    fn test_normalize(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(normalizer().normalize(name), expected);
    }

    #[rstest]
    #[case("Example Sports One")]
    #[case("beIN Sports 1 HD")]
    #[case("HD TV")]
    #[case("Sky Sports Main Event UK")]
    #[case("ＳＰＯＴＶ２")]
    fn test_normalize_is_idempotent(#[case] name: &str) {
        let n = normalizer();
        let once = n.normalize(name);
        assert_eq!(n.normalize(&once), once);
    }

    #[rstest]
    #[case("ExampleSports 1", "examplesports")]
    #[case("Example Sports One", "examplesports")]
    #[case("Example Sports 2 HD", "examplesports")]
    #[case("Sky Sports Main Event", "skysports")]
    #[case("beinsports3", "beinsports")]
    #[case("F1 TV", "f1")]
    fn test_family_key(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(normalizer().family_key(name), expected);
    }

    #[test]
    fn test_family_key_falls_back_to_identity_key() {
        let n = normalizer();
        assert_eq!(n.family_key("Channel 5"), n.normalize("Channel 5"));
    }

    #[rstest]
    #[case("ExampleSports 1", Some(1))]
    #[case("Example Sports One", Some(1))]
    #[case("Sky Sports Main Event", Some(1))]
    #[case("SPOTV2", Some(2))]
    #[case("beIN Sports 3 HD", Some(3))]
    #[case("Sports 1080p", None)]
    #[case("Eurosport", None)]
    fn test_ordinal(#[case] name: &str, #[case] expected: Option<u32>) {
        assert_eq!(normalizer().ordinal(name), expected);
    }
}
