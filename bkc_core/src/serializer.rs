//! Writes [`Event`]s as an RFC 5545 iCalendar document.
//!
//! Text values are escaped, content lines longer than 75 octets are folded and
//! every line ends with CRLF. With [`TimestampStyle::Local`] each distinct
//! offset gets a fixed-offset `VTIMEZONE`, so local times stay exactly as
//! published.
//!
//! The lines are assembled here instead of with `ical::generator`, which folds
//! with bare line feeds and leaves property values unescaped.

use std::io::{BufReader, Cursor};

use chrono::{DateTime, FixedOffset, Utc};
use ical::IcalParser;

use crate::{
    config::{Config, TimestampStyle},
    error::{Error, Result},
    event::Event,
};

static PROD_ID: [&str; 3] = ["Brisbane Kids Calendar", "brisbanekids.com.au", "EN"];
static UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";
static LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
static CRLF: &str = "\r\n";
const MAX_LINE_OCTETS: usize = 75;

/// Build the calendar document for the events, in the given order.
///
/// `generated_at` becomes the `DTSTAMP` of every event.
pub fn serialize(events: &[Event], config: &Config, generated_at: DateTime<Utc>) -> Result<String> {
    let mut document = Document::default();
    document.line("BEGIN", "VCALENDAR");
    document.line("VERSION", "2.0");
    document.line("PRODID", &prod_id());
    document.line("CALSCALE", "GREGORIAN");
    document.line("METHOD", "PUBLISH");
    if let Some(calendar_name) = &config.calendar_name {
        document.text("X-WR-CALNAME", calendar_name)?;
    }
    if config.timestamp_style == TimestampStyle::Local {
        for offset in distinct_offsets(events) {
            document.timezone(&offset);
        }
    }
    let dtstamp = generated_at.format(UTC_FORMAT).to_string();
    for event in events {
        document.event(event, &dtstamp, config.timestamp_style)?;
    }
    document.line("END", "VCALENDAR");
    verify(&document.0, events.len())?;
    Ok(document.0)
}

#[derive(Default)]
struct Document(String);

impl Document {
    fn line(&mut self, name: &str, value: &str) {
        self.0.push_str(&fold_line(&format!("{name}:{value}")));
        self.0.push_str(CRLF);
    }

    fn text(&mut self, name: &str, value: &str) -> Result<()> {
        let escaped = escape_text(value);
        if escaped.chars().any(|c| c.is_control() && c != '\t') {
            return Err(Error::Serialization(format!(
                "{name} contains a control character: {value:?}"
            )));
        }
        self.line(name, &escaped);
        Ok(())
    }

    /// URIs are not TEXT, so nothing gets escaped and anything unsafe is an error.
    fn uri(&mut self, name: &str, value: &str) -> Result<()> {
        if value.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(Error::Serialization(format!(
                "{name} contains whitespace or a control character: {value:?}"
            )));
        }
        self.line(name, value);
        Ok(())
    }

    fn datetime(&mut self, name: &str, value: &DateTime<FixedOffset>, style: TimestampStyle) {
        if style == TimestampStyle::Utc || value.offset().local_minus_utc() == 0 {
            self.line(name, &value.with_timezone(&Utc).format(UTC_FORMAT).to_string());
        } else {
            let name = format!("{name};TZID={}", tzid(value.offset()));
            self.line(&name, &value.format(LOCAL_FORMAT).to_string());
        }
    }

    fn timezone(&mut self, offset: &FixedOffset) {
        let id = tzid(offset);
        let digits = offset_digits(offset);
        self.line("BEGIN", "VTIMEZONE");
        self.line("TZID", &id);
        self.line("BEGIN", "STANDARD");
        self.line("DTSTART", "19700101T000000");
        self.line("TZOFFSETFROM", &digits);
        self.line("TZOFFSETTO", &digits);
        self.line("TZNAME", &id);
        self.line("END", "STANDARD");
        self.line("END", "VTIMEZONE");
    }

    fn event(&mut self, event: &Event, dtstamp: &str, style: TimestampStyle) -> Result<()> {
        self.line("BEGIN", "VEVENT");
        self.text("UID", &event.uid)?;
        self.line("DTSTAMP", dtstamp);
        self.datetime("DTSTART", &event.start, style);
        self.datetime("DTEND", &event.end, style);
        self.text("SUMMARY", &event.title)?;
        if !event.location_text.is_empty() {
            self.text("LOCATION", &event.location_text)?;
        }
        if !event.description_text.is_empty() {
            self.text("DESCRIPTION", &event.description_text)?;
        }
        if let Some(url) = &event.url {
            self.uri("URL", url)?;
        }
        self.line("END", "VEVENT");
        Ok(())
    }
}

/// Escape a TEXT value.
///
/// The backslash goes first, otherwise the escapes of the other characters
/// would be escaped again.
pub fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(';', "\\;")
        .replace("\r\n", "\\n")
        .replace('\r', "\\n")
        .replace('\n', "\\n")
}

/// Reverse [`escape_text`].
pub fn unescape_text(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => unescaped.push('\n'),
            Some(escaped @ ('\\' | ',' | ';')) => unescaped.push(escaped),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

/// Fold a content line (without its CRLF) into lines of at most 75 octets.
///
/// Continuation lines start with a single space. Multi-byte characters are
/// never split.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut folded = String::with_capacity(line.len() + line.len() / (MAX_LINE_OCTETS - 1) * 3);
    let mut rest = line;
    let mut limit = MAX_LINE_OCTETS;
    while rest.len() > limit {
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        folded.push_str(&rest[..split]);
        folded.push_str(CRLF);
        folded.push(' ');
        rest = &rest[split..];
        limit = MAX_LINE_OCTETS - 1;
    }
    folded.push_str(rest);
    folded
}

/// Join folded lines again.
pub fn unfold(text: &str) -> String {
    text.replace("\r\n ", "").replace("\r\n\t", "")
}

/// The `TZID` of a fixed offset, e.g. `UTC+1000`.
pub fn tzid(offset: &FixedOffset) -> String {
    format!("UTC{}", offset_digits(offset))
}

/// A UTC-OFFSET value, e.g. `+1000` or `-0330`.
fn offset_digits(offset: &FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.abs();
    let (hours, minutes, seconds) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
    if seconds == 0 {
        format!("{sign}{hours:02}{minutes:02}")
    } else {
        format!("{sign}{hours:02}{minutes:02}{seconds:02}")
    }
}

/// Non-zero offsets of all start and end times, in order of appearance.
fn distinct_offsets(events: &[Event]) -> Vec<FixedOffset> {
    let mut offsets: Vec<FixedOffset> = vec![];
    for offset in events
        .iter()
        .flat_map(|event| [*event.start.offset(), *event.end.offset()])
    {
        if offset.local_minus_utc() != 0 && !offsets.contains(&offset) {
            offsets.push(offset);
        }
    }
    offsets
}

fn prod_id() -> String {
    let mut strings: Vec<&str> = Vec::from(PROD_ID);
    strings.insert(0, "-");
    strings.join("//")
}

/// Read the document back and make sure nothing got lost.
fn verify(document: &str, expected_events: usize) -> Result<()> {
    if document.split(CRLF).any(|line| line.contains(['\r', '\n'])) {
        return Err(Error::Serialization(String::from(
            "document contains a line break that is not CRLF"
        )));
    }
    let parser = IcalParser::new(BufReader::new(Cursor::new(document)));
    let mut calendars = 0;
    let mut events = 0;
    for ical_calendar_result in parser {
        let ical_calendar =
            ical_calendar_result.map_err(|err| Error::Serialization(err.to_string()))?;
        calendars += 1;
        events += ical_calendar.events.len();
    }
    if calendars != 1 || events != expected_events {
        return Err(Error::Serialization(format!(
            "document reads back as {calendars} calendar(s) with {events} event(s), expected 1 with {expected_events}"
        )));
    }
    Ok(())
}
