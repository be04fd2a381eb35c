use std::path::PathBuf;

use anyhow::Result;
use bkc_core::{
    chrono::FixedOffset, config::offset_arg, load_records, pipeline, Config, LocationFields,
    SortPolicy, TimestampStyle,
};
use clap::Parser;
use log::warn;

/// Turn extracted Brisbane Kids event records into an iCalendar file.
#[derive(Debug, Parser)]
pub struct Arguments {
    /// the JSON file with the extracted event records
    pub records: PathBuf,
    /// where to write the calendar
    #[arg(long, short, default_value = "brisbanekids.ics")]
    pub output: PathBuf,
    /// offset for times published without one
    #[arg(long, value_parser = offset_arg, default_value = "+10:00")]
    pub default_offset: FixedOffset,
    /// `input` keeps the order of the records, `start` sorts by start time
    #[arg(long, default_value_t = SortPolicy::Input)]
    pub sort: SortPolicy,
    /// include the region in event locations
    #[arg(long)]
    pub include_region: bool,
    /// include the country in event locations
    #[arg(long)]
    pub include_country: bool,
    /// reduce HTML descriptions to plain text
    #[arg(long)]
    pub plain_descriptions: bool,
    /// write all times in UTC
    #[arg(long)]
    pub utc: bool,
    /// the calendar name shown by calendar applications
    #[arg(long, default_value = "Brisbane Kids Events")]
    pub calendar_name: String,
}

impl From<&Arguments> for LocationFields {
    fn from(value: &Arguments) -> Self {
        let mut location_fields = LocationFields::standard();
        if value.include_region {
            location_fields |= LocationFields::Region;
        }
        if value.include_country {
            location_fields |= LocationFields::Country;
        }
        location_fields
    }
}

impl From<&Arguments> for Config {
    fn from(value: &Arguments) -> Self {
        Config {
            output_path: value.output.clone(),
            default_utc_offset: value.default_offset,
            sort_policy: value.sort,
            location_fields: LocationFields::from(value),
            plain_descriptions: value.plain_descriptions,
            timestamp_style: if value.utc {
                TimestampStyle::Utc
            } else {
                TimestampStyle::Local
            },
            calendar_name: Some(value.calendar_name.clone()).filter(|name| !name.is_empty()),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Arguments::parse();
    let records = load_records(&args.records)?;
    let diagnostics = pipeline::run(records, &Config::from(&args))?;
    if diagnostics.accepted == 0 && diagnostics.seen > 0 {
        warn!("none of the {} records could be used", diagnostics.seen);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bkc_core::{Config, LocationFields, SortPolicy, TimestampStyle};
    use clap::Parser;

    use crate::Arguments;

    #[test]
    fn test_defaults() {
        let args = Arguments::parse_from(["bkc_cli", "records.json"]);
        let config = Config::from(&args);
        assert_eq!(config.output_path.to_str(), Some("brisbanekids.ics"));
        assert_eq!(config.default_utc_offset.local_minus_utc(), 36000);
        assert_eq!(config.sort_policy, SortPolicy::Input);
        assert_eq!(config.location_fields, LocationFields::standard());
        assert_eq!(config.timestamp_style, TimestampStyle::Local);
        assert_eq!(config.calendar_name.as_deref(), Some("Brisbane Kids Events"));
        assert!(!config.plain_descriptions);
    }

    #[test]
    fn test_flags() {
        let args = Arguments::parse_from([
            "bkc_cli",
            "records.json",
            "--output",
            "out/kids.ics",
            "--default-offset",
            "+09:30",
            "--sort",
            "start",
            "--include-region",
            "--include-country",
            "--plain-descriptions",
            "--utc",
            "--calendar-name",
            "",
        ]);
        let config = Config::from(&args);
        assert_eq!(config.output_path.to_str(), Some("out/kids.ics"));
        assert_eq!(config.default_utc_offset.local_minus_utc(), 34200);
        assert_eq!(config.sort_policy, SortPolicy::Start);
        assert_eq!(
            config.location_fields,
            LocationFields::standard() | LocationFields::Region | LocationFields::Country
        );
        assert!(config.plain_descriptions);
        assert_eq!(config.timestamp_style, TimestampStyle::Utc);
        assert_eq!(config.calendar_name, None);
    }

    #[test]
    fn test_invalid_offset() {
        let result =
            Arguments::try_parse_from(["bkc_cli", "records.json", "--default-offset", "AEST"]);
        assert!(result.is_err());
    }
}
