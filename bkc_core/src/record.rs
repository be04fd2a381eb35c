//! Raw event records as extracted from the pages' JSON-LD.
//!
//! Every field may be missing, nothing is validated here. An entry that does
//! not even have the shape of an event is kept as a malformed record, so it
//! still shows up in the diagnostics of the run.

use std::{fs::read_to_string, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// A schema.org `Event` as published by the site.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventRecord {
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<RawLocation>,
    pub description: Option<String>,
    pub url: Option<String>,
    /// Why the entry could not be read as an event.
    #[serde(skip)]
    pub malformed: Option<String>,
}

impl RawEventRecord {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            malformed: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// schema.org allows a `Place`, a line of text or a list of those.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawLocation {
    Text(String),
    List(Vec<RawLocation>),
    Place(RawPlace),
}

/// A schema.org `Place`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPlace {
    pub name: Option<String>,
    pub address: Option<RawAddress>,
}

/// Either a structured `PostalAddress` or a single line of text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAddress {
    Postal(PostalAddress),
    Line(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub street_address: Option<String>,
    pub address_locality: Option<String>,
    pub address_region: Option<String>,
    pub postal_code: Option<String>,
    pub address_country: Option<String>,
}

/// Read the records from a JSON file.
pub fn load_records(path: &Path) -> Result<Vec<RawEventRecord>> {
    let json = read_to_string(path)
        .with_context(|| format!("failed to read event records from {}", path.display()))?;
    parse_records(&json).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parse a JSON array of records, or a single record.
///
/// Entries that do not have the shape of an event become
/// [`RawEventRecord::malformed`] records.
pub fn parse_records(json: &str) -> Result<Vec<RawEventRecord>> {
    let value: Value = serde_json::from_str(json).context("event records are not valid JSON")?;
    let entries = match value {
        Value::Array(entries) => entries,
        object @ Value::Object(_) => vec![object],
        _ => bail!("expected an array of event records"),
    };
    let records = entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value::<RawEventRecord>(entry)
                .unwrap_or_else(|err| RawEventRecord::malformed(err.to_string()))
        })
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use crate::record::{
        parse_records, PostalAddress, RawAddress, RawEventRecord, RawLocation, RawPlace,
    };

    /// Test whether a dump of the extraction step is read correctly.
    #[test]
    fn test_parse_records() {
        let json = include_str!("record/tests/records.json");
        let records = parse_records(json).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(
            records[0],
            RawEventRecord {
                name: Some(String::from("Story Time")),
                start_date: Some(String::from("2024-01-25T10:00:00+10:00")),
                end_date: Some(String::from("2024-01-25T11:00:00+10:00")),
                location: Some(RawLocation::Place(RawPlace {
                    name: Some(String::from("Brisbane City Library")),
                    address: Some(RawAddress::Postal(PostalAddress {
                        street_address: Some(String::from("266 George Street")),
                        address_locality: Some(String::from("Brisbane City")),
                        address_region: Some(String::from("QLD")),
                        postal_code: Some(String::from("4000")),
                        address_country: Some(String::from("Australia")),
                    })),
                })),
                description: Some(String::from("<p>Stories, songs &amp; rhymes.</p>")),
                url: Some(String::from(
                    "https://brisbanekids.com.au/event/story-time-brisbane-city-library/"
                )),
                malformed: None,
            }
        );
        assert_eq!(
            records[1].location,
            Some(RawLocation::Place(RawPlace {
                name: Some(String::from("South Bank Parklands")),
                address: Some(RawAddress::Line(String::from(
                    "Clem Jones Promenade, South Brisbane"
                ))),
            }))
        );
        assert!(records[2].malformed.is_some());
        assert_eq!(records[2].name, None);
        assert_eq!(records[3].name, None);
        assert_eq!(records[3].location, None);
        assert_eq!(records[3].malformed, None);
    }

    #[test]
    fn test_parse_single_record() {
        let records = parse_records(r#"{"name": "Lantern Parade", "startDate": null}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("Lantern Parade"));
        assert_eq!(records[0].start_date, None);
    }

    #[test]
    fn test_location_as_text() {
        let json = r#"[
            {"name": "Online Story Time", "startDate": "2024-01-25T10:00:00+10:00", "location": "Online"},
            {"name": "Two Stages", "startDate": "2024-01-25T10:00:00+10:00", "location": [{"name": "A"}, "B"]},
            {"name": "Broken Place", "startDate": "2024-01-25T10:00:00+10:00", "location": 7}
        ]"#;
        let records = parse_records(json).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].location,
            Some(RawLocation::Text(String::from("Online")))
        );
        assert_eq!(
            records[1].location,
            Some(RawLocation::List(vec![
                RawLocation::Place(RawPlace {
                    name: Some(String::from("A")),
                    address: None,
                }),
                RawLocation::Text(String::from("B")),
            ]))
        );
        assert_eq!(records[2].name, None);
        assert!(records[2].malformed.is_some());
    }

    #[test]
    fn test_parse_records_rejects_non_records() {
        assert!(parse_records("<html></html>").is_err());
        assert!(parse_records("42").is_err());
        assert!(parse_records("[]").unwrap().is_empty());
    }
}
