//! Validates raw records and turns them into [`Event`]s.
//!
//! A broken record never stops the batch. It is dropped, logged and listed in
//! the [`Diagnostics`] of the run.

use std::{collections::HashSet, fmt};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use log::{debug, warn};
use regex::{Captures, Regex};
use scraper::{Html, Node};
use thiserror::Error;

use crate::{
    config::{Config, LocationFields},
    event::Event,
    record::{RawAddress, RawEventRecord, RawLocation},
};

/// Elements whose content is separated from the surrounding text.
static BLOCK_ELEMENTS: [&str; 14] = [
    "address", "blockquote", "br", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "p", "td",
    "tr",
];

static UNTITLED: &str = "Untitled Event";
static UID_DOMAIN: &str = "brisbanekids";
static LOCATION_SEPARATOR: &str = ", ";

/// Why a record did not make it into the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("record is not a schema.org event: {0}")]
    MalformedRecord(String),
    #[error("missing required field {0}")]
    MissingRequiredField(&'static str),
    #[error("{field} `{value}` is not a timestamp like 2024-01-25T10:00:00+10:00")]
    UnparsableTimestamp { field: &'static str, value: String },
    #[error("end {end} is before start {start}")]
    InvalidInterval {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
    #[error("uid {0} was already taken by an earlier record")]
    DuplicateIdentifier(String),
}

/// The result of validating a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(Event),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Position of the record in the input.
    pub index: usize,
    pub url: Option<String>,
    pub reason: RejectReason,
}

/// What happened to the records of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub seen: usize,
    pub accepted: usize,
    pub rejections: Vec<Rejection>,
}

impl Diagnostics {
    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records seen, {} accepted, {} rejected",
            self.seen,
            self.accepted,
            self.rejected()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub events: Vec<Event>,
    pub diagnostics: Diagnostics,
}

/// Normalize a batch of records.
///
/// Events keep the order of their records. Of two records with the same uid
/// only the first one is kept.
pub fn normalize<I>(records: I, config: &Config) -> Normalized
where
    I: IntoIterator<Item = RawEventRecord>,
{
    let normalizer = Normalizer::new(config);
    let mut normalized = Normalized::default();
    let mut uids: HashSet<String> = HashSet::new();
    for (index, record) in records.into_iter().enumerate() {
        normalized.diagnostics.seen += 1;
        let outcome = match normalizer.normalize_record(&record) {
            Outcome::Accepted(event) if !uids.insert(event.uid.clone()) => {
                Outcome::Rejected(RejectReason::DuplicateIdentifier(event.uid))
            }
            outcome => outcome,
        };
        match outcome {
            Outcome::Accepted(event) => {
                debug!("accepted record #{index} as {}", event.uid);
                normalized.diagnostics.accepted += 1;
                normalized.events.push(event);
            }
            Outcome::Rejected(reason) => {
                warn!(
                    "dropping record #{index} ({}): {reason}",
                    record.url.as_deref().unwrap_or("no url")
                );
                normalized.diagnostics.rejections.push(Rejection {
                    index,
                    url: record.url,
                    reason,
                });
            }
        }
    }
    normalized
}

/// Validates single records against a configuration.
pub struct Normalizer<'a> {
    config: &'a Config,
    timestamp_regex: Regex,
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a Config) -> Self {
        let timestamp_regex = Regex::new(
            r"(?x)
                ^
                (?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})
                T
                (?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})
                (?:(?P<utc>Z)|(?P<sign>[+-])(?P<hours>\d{2}):(?P<minutes>\d{2}))? # optional
                $
            ",
        )
        .unwrap();
        Self {
            config,
            timestamp_regex,
        }
    }

    /// Validate a record, independent of any other record.
    pub fn normalize_record(&self, record: &RawEventRecord) -> Outcome {
        if let Some(malformed) = &record.malformed {
            return Outcome::Rejected(RejectReason::MalformedRecord(malformed.clone()));
        }
        let name = present(&record.name);
        let Some(start_date) = present(&record.start_date) else {
            let missing = if name.is_none() {
                "name and startDate"
            } else {
                "startDate"
            };
            return Outcome::Rejected(RejectReason::MissingRequiredField(missing));
        };
        let Some(start) = self.parse_timestamp(start_date) else {
            return Outcome::Rejected(RejectReason::UnparsableTimestamp {
                field: "startDate",
                value: start_date.to_string(),
            });
        };
        let end = match present(&record.end_date) {
            Some(end_date) => match self.parse_timestamp(end_date) {
                Some(end) => end,
                None => {
                    return Outcome::Rejected(RejectReason::UnparsableTimestamp {
                        field: "endDate",
                        value: end_date.to_string(),
                    })
                }
            },
            None => start + Duration::hours(1),
        };
        if end < start {
            return Outcome::Rejected(RejectReason::InvalidInterval { start, end });
        }
        let title = name
            .map(strip_controls)
            .filter(|title| !title.trim().is_empty())
            .map(|title| title.trim().to_string())
            .unwrap_or_else(|| String::from(UNTITLED));
        let description = record.description.as_deref().unwrap_or_default();
        let description_text = if self.config.plain_descriptions {
            html_to_text(description)
        } else {
            strip_controls(description)
        };
        let url = present(&record.url)
            .filter(|url| {
                let usable = !url.chars().any(|c| c.is_control() || c.is_whitespace());
                if !usable {
                    warn!("ignoring url {url:?} of {title:?}, it is not a single token");
                }
                usable
            })
            .map(String::from);
        Outcome::Accepted(Event {
            uid: uid(url.as_deref(), &title, &start),
            title,
            start,
            end,
            location_text: flatten_location(record.location.as_ref(), self.config.location_fields),
            description_text,
            url,
        })
    }

    /// Parse `YYYY-MM-DDTHH:MM:SS` with an optional `±HH:MM` or `Z` suffix.
    pub fn parse_timestamp(&self, value: &str) -> Option<DateTime<FixedOffset>> {
        let captures = self.timestamp_regex.captures(value.trim())?;
        let number = |name: &str| -> Option<u32> { captures[name].parse().ok() };
        let naive = NaiveDate::from_ymd_opt(
            captures["year"].parse().ok()?,
            number("month")?,
            number("day")?,
        )?
        .and_hms_opt(number("hour")?, number("minute")?, number("second")?)?;
        let offset = if captures.name("utc").is_some() || captures.name("sign").is_some() {
            offset_from_captures(&captures)?
        } else {
            self.config.default_utc_offset
        };
        offset.from_local_datetime(&naive).single()
    }
}

/// Parse `Z`, `+HH:MM` or `-HH:MM`.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let offset_regex =
        Regex::new(r"^(?:(?P<utc>Z)|(?P<sign>[+-])(?P<hours>\d{2}):(?P<minutes>\d{2}))$").unwrap();
    let captures = offset_regex.captures(value.trim())?;
    offset_from_captures(&captures)
}

fn offset_from_captures(captures: &Captures) -> Option<FixedOffset> {
    if captures.name("utc").is_some() {
        return FixedOffset::east_opt(0);
    }
    let hours: i32 = captures["hours"].parse().ok()?;
    let minutes: i32 = captures["minutes"].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = hours * 3600 + minutes * 60;
    match &captures["sign"] {
        "-" => FixedOffset::west_opt(seconds),
        _ => FixedOffset::east_opt(seconds),
    }
}

/// Join the wanted parts of a location into one line.
///
/// A list of locations is flattened in order, parts that already appeared are
/// left out.
pub fn flatten_location(location: Option<&RawLocation>, fields: LocationFields) -> String {
    let mut parts = vec![];
    if let Some(location) = location {
        location_parts(location, fields, &mut parts);
    }
    parts.join(LOCATION_SEPARATOR)
}

fn location_parts(location: &RawLocation, fields: LocationFields, parts: &mut Vec<String>) {
    let place = match location {
        RawLocation::Text(text) => vec![(LocationFields::Venue, Some(text.as_str()))],
        RawLocation::List(locations) => {
            for location in locations {
                location_parts(location, fields, parts);
            }
            return;
        }
        RawLocation::Place(place) => {
            let mut place_parts = vec![(LocationFields::Venue, place.name.as_deref())];
            match &place.address {
                Some(RawAddress::Postal(address)) => place_parts.extend([
                    (LocationFields::Street, address.street_address.as_deref()),
                    (LocationFields::Locality, address.address_locality.as_deref()),
                    (LocationFields::Region, address.address_region.as_deref()),
                    (LocationFields::Postcode, address.postal_code.as_deref()),
                    (LocationFields::Country, address.address_country.as_deref()),
                ]),
                Some(RawAddress::Line(line)) => {
                    place_parts.push((LocationFields::Street, Some(line.as_str())))
                }
                None => {}
            }
            place_parts
        }
    };
    for part in place
        .into_iter()
        .filter(|(field, _)| fields.contains(*field))
        .filter_map(|(_, part)| part)
        .map(|part| strip_controls(part).trim().to_string())
    {
        if !part.is_empty() && !parts.contains(&part) {
            parts.push(part);
        }
    }
}

/// Get a unique id for an event posting.
///
/// Changing this function is a breaking change!
pub fn uid(url: Option<&str>, title: &str, start: &DateTime<FixedOffset>) -> String {
    let digest = match url {
        Some(url) => md5::compute(url),
        None => md5::compute(format!("{title}{}", start.to_rfc3339())),
    };
    format!("{digest:x}@{UID_DOMAIN}")
}

/// Reduce an HTML fragment to its text with collapsed whitespace.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(text_node) => text.push_str(text_node),
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => text.push(' '),
            _ => {}
        }
    }
    strip_controls(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Control characters other than tabs and line breaks cannot be written to a calendar.
fn strip_controls(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}
