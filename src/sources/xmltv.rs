//! Quick-XML based XMLTV parser
//!
//! Streams through the guide once, collecting `<channel>` ids with their first
//! display name and `<programme>` records with their first title. Programme
//! times are folded into the guide timezone and the title is classified as the
//! record is built, so downstream stages only ever see finished
//! [`ProgrammeEvent`]s.

use chrono_tz::Tz;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::{SourceError, SourceResult};
use crate::matching::ProgrammeClassifier;
use crate::models::{EpgChannel, EpgDocument, ProgrammeEvent};
use crate::utils::parse_xmltv_timestamp;

const SOURCE_TYPE: &str = "xmltv";

#[derive(Debug, Default)]
struct PartialChannel {
    id: String,
    display_name: Option<String>,
}

#[derive(Debug, Default)]
struct PartialProgramme {
    channel: String,
    start: Option<String>,
    stop: Option<String>,
    title: Option<String>,
}

/// Parse XMLTV content into channels and classified programmes
pub fn parse_epg(
    content: &str,
    tz: Tz,
    classifier: &ProgrammeClassifier,
) -> SourceResult<EpgDocument> {
    let mut reader = Reader::from_str(content);

    let mut document = EpgDocument::default();
    let mut current_channel: Option<PartialChannel> = None;
    let mut current_programme: Option<PartialProgramme> = None;
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                match e.name().as_ref() {
                    b"channel" => {
                        let attrs = parse_attributes(e);
                        current_channel = Some(PartialChannel {
                            id: attrs.get("id").cloned().unwrap_or_default(),
                            display_name: None,
                        });
                    }
                    b"programme" => current_programme = Some(programme_from(e)),
                    _ => {}
                }
                current_text.clear();
            }

            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"channel" => {
                    let attrs = parse_attributes(e);
                    finish_channel(
                        &mut document,
                        PartialChannel {
                            id: attrs.get("id").cloned().unwrap_or_default(),
                            display_name: None,
                        },
                    );
                }
                b"programme" => {
                    finish_programme(&mut document, programme_from(e), tz, classifier);
                }
                _ => {}
            },

            Ok(Event::End(ref e)) => {
                let text = current_text.trim();
                match e.name().as_ref() {
                    b"display-name" => {
                        if let Some(channel) = current_channel.as_mut() {
                            if channel.display_name.is_none() && !text.is_empty() {
                                channel.display_name = Some(text.to_string());
                            }
                        }
                    }
                    b"title" => {
                        if let Some(programme) = current_programme.as_mut() {
                            if programme.title.is_none() && !text.is_empty() {
                                programme.title = Some(text.to_string());
                            }
                        }
                    }
                    b"channel" => {
                        if let Some(channel) = current_channel.take() {
                            finish_channel(&mut document, channel);
                        }
                    }
                    b"programme" => {
                        if let Some(programme) = current_programme.take() {
                            finish_programme(&mut document, programme, tz, classifier);
                        }
                    }
                    _ => {}
                }
                current_text.clear();
            }

            Ok(Event::Text(e)) => {
                let text = std::str::from_utf8(&e).map_err(|e| {
                    SourceError::parse_error(SOURCE_TYPE, format!("Invalid UTF-8 in text: {e}"))
                })?;
                current_text.push_str(text);
            }

            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(&e).map_err(|e| {
                    SourceError::parse_error(SOURCE_TYPE, format!("Invalid UTF-8 in CDATA: {e}"))
                })?;
                current_text.push_str(text);
            }

            Ok(Event::GeneralRef(e)) => {
                let name = std::str::from_utf8(&e).map_err(|e| {
                    let message = format!("Invalid UTF-8 in reference: {e}");
                    SourceError::parse_error(SOURCE_TYPE, message)
                })?;
                match resolve_reference(name) {
                    Some(resolved) => current_text.push_str(&resolved),
                    None => {
                        current_text.push('&');
                        current_text.push_str(name);
                        current_text.push(';');
                    }
                }
            }

            Ok(Event::Eof) => break,

            Err(e) => {
                return Err(SourceError::parse_error(
                    SOURCE_TYPE,
                    format!("XML parsing error at byte {}: {e}", reader.error_position()),
                ));
            }

            _ => {} // declarations, comments, processing instructions
        }
    }

    debug!(
        "Parsed {} channels and {} programmes ({} dropped)",
        document.channels.len(),
        document.programmes.len(),
        document.dropped_programmes
    );
    Ok(document)
}

fn programme_from(element: &BytesStart) -> PartialProgramme {
    let mut attrs = parse_attributes(element);
    PartialProgramme {
        channel: attrs.remove("channel").unwrap_or_default(),
        start: attrs.remove("start"),
        stop: attrs.remove("stop"),
        title: None,
    }
}

fn finish_channel(document: &mut EpgDocument, channel: PartialChannel) {
    let id = channel.id.trim();
    if id.is_empty() {
        debug!("Skipping guide channel without id");
        return;
    }
    document.channels.push(EpgChannel {
        id: id.to_string(),
        display_name: channel.display_name.unwrap_or_else(|| id.to_string()),
    });
}

fn finish_programme(
    document: &mut EpgDocument,
    programme: PartialProgramme,
    tz: Tz,
    classifier: &ProgrammeClassifier,
) {
    let title = programme.title.unwrap_or_default();

    let parse = |value: Option<&String>| value.and_then(|v| parse_xmltv_timestamp(v, tz).ok());
    let start = parse(programme.start.as_ref());
    let stop = parse(programme.stop.as_ref());

    let event = match (start, stop) {
        (Some(start), Some(stop)) if !programme.channel.is_empty() => {
            let category = classifier.classify(&title);
            ProgrammeEvent::new(programme.channel.as_str(), title.as_str(), start, stop, category)
        }
        _ => None,
    };

    match event {
        Some(event) => document.programmes.push(event),
        None => {
            document.dropped_programmes += 1;
            debug!(
                "Dropping programme '{}' on '{}': start={:?} stop={:?}",
                title, programme.channel, programme.start, programme.stop
            );
        }
    }
}

/// Resolve a predefined entity (`amp`) or character reference (`#38`, `#x26`)
fn resolve_reference(name: &str) -> Option<Cow<'static, str>> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code).map(|c| Cow::Owned(c.to_string()));
    }
    quick_xml::escape::resolve_predefined_entity(name).map(Cow::Borrowed)
}

/// Parse XML attributes into a HashMap, unescaping values
fn parse_attributes(element: &BytesStart) -> HashMap<String, String> {
    let mut attrs = HashMap::new();

    for attr in element.attributes().flatten() {
        if let (Ok(key), Ok(value)) = (
            std::str::from_utf8(attr.key.as_ref()),
            std::str::from_utf8(&attr.value),
        ) {
            let value = quick_xml::escape::unescape(value)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| value.to_string());
            attrs.insert(key.to_string(), value);
        }
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::models::ProgrammeCategory;
    use chrono::NaiveDate;

    const GUIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE tv SYSTEM "xmltv.dtd">
<tv generator-info-name="test">
  <channel id="ES1">
    <display-name>Example Sports One</display-name>
    <display-name>ES1</display-name>
  </channel>
  <channel id="R&amp;D.tv"/>
  <programme start="20251223200000 +0700" stop="20251223220000 +0700" channel="ES1">
    <title lang="en">Team A &amp; Co vs Team B</title>
    <title lang="id">Tim A vs Tim B</title>
  </programme>
  <programme start="20251223130000 +0000" stop="20251223150000 +0000" channel="ES1">
    <title><![CDATA[Match Highlights]]></title>
  </programme>
  <programme start="20251223220000 +0700" stop="20251223210000 +0700" channel="ES1">
    <title>Inverted vs Times</title>
  </programme>
  <programme start="tomorrow" stop="20251223210000 +0700" channel="ES1">
    <title>Broken vs Start</title>
  </programme>
  <programme start="20251223200000 +0700" channel="ES1">
    <title>No vs Stop</title>
  </programme>
</tv>"#;

    fn parse(content: &str) -> SourceResult<EpgDocument> {
        let tz: Tz = "Asia/Jakarta".parse().unwrap();
        parse_epg(content, tz, &ProgrammeClassifier::new(&ClassifierConfig::default()))
    }

    #[test]
    fn test_parse_channels() {
        let document = parse(GUIDE).unwrap();
        assert_eq!(
            document.channels,
            vec![
                EpgChannel {
                    id: "ES1".to_string(),
                    display_name: "Example Sports One".to_string(),
                },
                EpgChannel {
                    id: "R&D.tv".to_string(),
                    display_name: "R&D.tv".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_programmes() {
        let document = parse(GUIDE).unwrap();
        assert_eq!(document.programmes.len(), 2);
        assert_eq!(document.dropped_programmes, 3);

        let first = &document.programmes[0];
        assert_eq!(first.title, "Team A & Co vs Team B");
        assert_eq!(first.category, ProgrammeCategory::Match);
        assert_eq!(
            first.start,
            NaiveDate::from_ymd_opt(2025, 12, 23).unwrap().and_hms_opt(20, 0, 0).unwrap()
        );

        // UTC times land in the guide timezone
        let second = &document.programmes[1];
        assert_eq!(second.title, "Match Highlights");
        assert_eq!(second.category, ProgrammeCategory::Excluded);
        assert_eq!(second.start, first.start);
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let result = parse("<tv><channel id=\"x\"></tv>");
        assert!(matches!(result, Err(SourceError::ParseError { .. })));
    }

    #[test]
    fn test_resolve_reference() {
        assert_eq!(resolve_reference("amp").as_deref(), Some("&"));
        assert_eq!(resolve_reference("#233").as_deref(), Some("é"));
        assert_eq!(resolve_reference("#x26").as_deref(), Some("&"));
        assert_eq!(resolve_reference("nbsp"), None);
    }
}
