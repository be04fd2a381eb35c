//! Options passed into the pipeline.

use std::{fmt, path::PathBuf, str::FromStr};

use bitmask_enum::bitmask;
use chrono::FixedOffset;
use serde::Deserialize;

use crate::normalizer::parse_utc_offset;

static OUTPUT_PATH: &str = "brisbanekids.ics";
static CALENDAR_NAME: &str = "Brisbane Kids Events";
/// Brisbane does not observe daylight saving time.
const BRISBANE_OFFSET_SECONDS: i32 = 10 * 3600;

/// The parts of a postal address that end up in an event's location line.
#[bitmask]
pub enum LocationFields {
    Venue,
    Street,
    Locality,
    Region,
    Postcode,
    Country,
}

impl LocationFields {
    /// Venue, street, locality and postcode.
    pub fn standard() -> Self {
        Self::Venue | Self::Street | Self::Locality | Self::Postcode
    }
}

/// Order of the events in the generated calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortPolicy {
    /// Keep the order in which the records were read.
    #[default]
    Input,
    /// Sort by start instant, ties keep their input order.
    Start,
}

impl FromStr for SortPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(Self::Input),
            "start" => Ok(Self::Start),
            other => Err(format!("unknown sort policy `{other}`, expected `input` or `start`")),
        }
    }
}

impl fmt::Display for SortPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Start => f.write_str("start"),
        }
    }
}

/// How `DTSTART` and `DTEND` are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampStyle {
    /// Keep the resolved offset by referencing a fixed-offset `VTIMEZONE`.
    #[default]
    Local,
    /// Convert everything to UTC.
    Utc,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output_path: PathBuf,
    /// Assumed for timestamps which carry no offset of their own.
    pub default_utc_offset: FixedOffset,
    pub sort_policy: SortPolicy,
    pub location_fields: LocationFields,
    /// Reduce HTML descriptions to plain text.
    pub plain_descriptions: bool,
    pub timestamp_style: TimestampStyle,
    pub calendar_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(OUTPUT_PATH),
            default_utc_offset: brisbane_offset(),
            sort_policy: SortPolicy::default(),
            location_fields: LocationFields::standard(),
            plain_descriptions: false,
            timestamp_style: TimestampStyle::default(),
            calendar_name: Some(String::from(CALENDAR_NAME)),
        }
    }
}

fn brisbane_offset() -> FixedOffset {
    FixedOffset::east_opt(BRISBANE_OFFSET_SECONDS).expect("offset is less than a day")
}

/// Parse a command line offset such as `+10:00`.
pub fn offset_arg(value: &str) -> Result<FixedOffset, String> {
    parse_utc_offset(value).ok_or_else(|| format!("`{value}` is not an offset like +10:00"))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::config::{offset_arg, Config, LocationFields, SortPolicy};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output_path.to_str(), Some("brisbanekids.ics"));
        assert_eq!(config.default_utc_offset.local_minus_utc(), 36000);
        assert_eq!(config.sort_policy, SortPolicy::Input);
        assert!(config.location_fields.contains(LocationFields::Postcode));
        assert!(!config.location_fields.contains(LocationFields::Region));
        assert!(!config.location_fields.contains(LocationFields::Country));
    }

    #[test]
    fn test_sort_policy_from_str() {
        assert_eq!(SortPolicy::from_str("input"), Ok(SortPolicy::Input));
        assert_eq!(SortPolicy::from_str("Start"), Ok(SortPolicy::Start));
        assert!(SortPolicy::from_str("alphabetical").is_err());
    }

    #[test]
    fn test_offset_arg() {
        assert_eq!(offset_arg("+10:00").unwrap().local_minus_utc(), 36000);
        assert_eq!(offset_arg("-03:30").unwrap().local_minus_utc(), -12600);
        assert_eq!(offset_arg("Z").unwrap().local_minus_utc(), 0);
        assert!(offset_arg("10").is_err());
        assert!(offset_arg("+25:00").is_err());
    }
}
