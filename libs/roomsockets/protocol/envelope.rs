//! Envelope addressing convention
//!
//! Every application message on the "message" route is a single text frame:
//!
//! ```text
//! sender=>[dest1,dest2,...]=>topic#value
//! ```
//!
//! The hub fans the frame out to every listed destination; this crate never
//! checks the destination list, it only builds and reads it. Raw control
//! strings ("ping", "pong", greetings) travel without any `=>` marker and
//! must still be readable as a bare topic.
//!
//! Only the first `#` separates topic from value. Any later `#` is literal
//! content of the value.

use crate::traits::ProtocolError;
use std::fmt;

/// Section separator
pub const SECTION_SEPARATOR: &str = "=>";

/// Topic/value separator
pub const VALUE_SEPARATOR: char = '#';

/// A fully addressed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: String,
    pub destinations: Vec<String>,
    pub topic: String,
    pub value: Option<String>,
}

impl Envelope {
    /// Build an envelope carrying `topic#value`
    pub fn new<I, S>(
        sender: impl Into<String>,
        destinations: I,
        topic: impl Into<String>,
        value: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sender: sender.into(),
            destinations: destinations.into_iter().map(Into::into).collect(),
            topic: topic.into(),
            value: Some(value.into()),
        }
    }

    /// Parse a full envelope
    ///
    /// Text without any `=>` is not an envelope and yields
    /// [`ProtocolError::MissingSeparator`]; use [`parse_topic_value`] for
    /// messages that may be raw.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        if raw.trim().is_empty() {
            return Err(ProtocolError::Empty);
        }

        let sections: Vec<&str> = raw.split(SECTION_SEPARATOR).collect();
        if sections.len() != 3 {
            return Err(ProtocolError::MissingSeparator {
                sections: sections.len(),
            });
        }

        let destinations = parse_destinations(sections[1])?;
        let (topic, value) = split_topic_value(sections[2]);

        Ok(Self {
            sender: sections[0].trim().to_string(),
            destinations,
            topic: topic.to_string(),
            value: value.map(str::to_string),
        })
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SECTION_SEPARATOR}[{}]{SECTION_SEPARATOR}{}",
            self.sender,
            self.destinations.join(","),
            self.topic
        )?;
        if let Some(value) = &self.value {
            write!(f, "{VALUE_SEPARATOR}{value}")?;
        }
        Ok(())
    }
}

/// Produce `sender=>[d1,d2,...]=>topic#value`
pub fn format<S: AsRef<str>>(sender: &str, destinations: &[S], topic: &str, value: &str) -> String {
    let destinations: Vec<&str> = destinations.iter().map(AsRef::as_ref).collect();
    format!(
        "{sender}{SECTION_SEPARATOR}[{}]{SECTION_SEPARATOR}{topic}{VALUE_SEPARATOR}{value}",
        destinations.join(",")
    )
}

/// Topic and optional value extracted from a payload, borrowed from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicValue<'a> {
    pub topic: &'a str,
    pub value: Option<&'a str>,
    /// Text after the last `=>` (the whole message when there is none)
    pub payload: &'a str,
}

/// Extract `(topic, value)` from any inbound text
///
/// Takes the text after the last `=>`, or the whole message when there is
/// no envelope marker, and splits it on the first `#`. Text without `#` is
/// an opaque topic with no value. Topic and value are returned verbatim,
/// surrounding whitespace included. Returns `None` only for empty payloads.
pub fn parse_topic_value(raw: &str) -> Option<TopicValue<'_>> {
    let payload = match raw.rfind(SECTION_SEPARATOR) {
        Some(idx) => &raw[idx + SECTION_SEPARATOR.len()..],
        None => raw,
    };
    if payload.is_empty() {
        return None;
    }

    let (topic, value) = split_topic_value(payload);
    Some(TopicValue {
        topic,
        value,
        payload,
    })
}

fn split_topic_value(payload: &str) -> (&str, Option<&str>) {
    match payload.split_once(VALUE_SEPARATOR) {
        Some((topic, value)) => (topic, Some(value)),
        None => (payload, None),
    }
}

fn parse_destinations(section: &str) -> Result<Vec<String>, ProtocolError> {
    let inner = section
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| ProtocolError::MalformedDestinations(section.to_string()))?;

    Ok(inner
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect())
}
