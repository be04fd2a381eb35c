//! Records in, calendar out.

use chrono::{DateTime, Utc};
use log::info;

use crate::{
    config::{Config, SortPolicy},
    error::Result,
    normalizer::{normalize, Diagnostics},
    persist::write_atomic,
    record::RawEventRecord,
    serializer::serialize,
};

#[derive(Debug, Clone)]
pub struct Generated {
    pub document: String,
    pub diagnostics: Diagnostics,
}

/// Normalize the records and build the calendar document.
pub fn generate(
    records: Vec<RawEventRecord>,
    config: &Config,
    generated_at: DateTime<Utc>,
) -> Result<Generated> {
    let mut normalized = normalize(records, config);
    if config.sort_policy == SortPolicy::Start {
        normalized.events.sort_by_key(|event| event.start);
    }
    let document = serialize(&normalized.events, config, generated_at)?;
    Ok(Generated {
        document,
        diagnostics: normalized.diagnostics,
    })
}

/// Generate the calendar and replace the file at `config.output_path` with it.
pub fn run(records: Vec<RawEventRecord>, config: &Config) -> Result<Diagnostics> {
    let generated = generate(records, config, Utc::now())?;
    write_atomic(&config.output_path, generated.document.as_bytes())?;
    info!(
        "wrote {} events to {} ({})",
        generated.diagnostics.accepted,
        config.output_path.display(),
        generated.diagnostics
    );
    Ok(generated.diagnostics)
}

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use chrono::{TimeZone, Utc};

    use crate::{
        config::{Config, SortPolicy},
        normalizer::RejectReason,
        pipeline::{generate, run},
        record::{parse_records, RawEventRecord},
    };

    fn record(name: &str, start: &str, url: &str) -> RawEventRecord {
        RawEventRecord {
            name: Some(String::from(name)),
            start_date: Some(String::from(start)),
            url: Some(String::from(url)),
            ..Default::default()
        }
    }

    fn titles(document: &str) -> Vec<&str> {
        document
            .split("\r\n")
            .filter_map(|line| line.strip_prefix("SUMMARY:"))
            .collect()
    }

    #[test]
    fn test_generate_fixture() {
        let records = parse_records(include_str!("record/tests/records.json")).unwrap();
        let generated_at = Utc.with_ymd_and_hms(2024, 1, 20, 6, 0, 0).unwrap();
        let generated = generate(records, &Config::default(), generated_at).unwrap();
        assert_eq!(generated.diagnostics.seen, 4);
        assert_eq!(generated.diagnostics.accepted, 2);
        assert_eq!(generated.diagnostics.rejections[0].index, 2);
        assert!(matches!(
            generated.diagnostics.rejections[0].reason,
            RejectReason::MalformedRecord(_)
        ));
        assert_eq!(
            generated.diagnostics.rejections[1].reason,
            RejectReason::UnparsableTimestamp {
                field: "startDate",
                value: String::from("2024-02-17"),
            }
        );
        assert_eq!(
            titles(&generated.document),
            vec!["Story Time", "Lantern Making Workshop"]
        );
        assert!(generated.document.contains(
            "LOCATION:Brisbane City Library\\, 266 George Street\\, Brisbane City\\, 4000\r\n"
        ));
        assert!(generated.document.contains(
            "LOCATION:South Bank Parklands\\, Clem Jones Promenade\\, South Brisbane\r\n"
        ));
        assert!(generated
            .document
            .contains("DTEND;TZID=UTC+1000:20240203T103000\r\n"));
    }

    #[test]
    fn test_sort_by_start() {
        let records = vec![
            record("Late", "2024-02-01T09:00:00+10:00", "https://example.org/late"),
            record("Early", "2024-01-01T09:00:00+10:00", "https://example.org/early"),
            record("Tie", "2024-02-01T09:00:00+10:00", "https://example.org/tie"),
        ];
        let config = Config {
            sort_policy: SortPolicy::Start,
            ..Config::default()
        };
        let generated = generate(records.clone(), &config, Utc::now()).unwrap();
        assert_eq!(titles(&generated.document), vec!["Early", "Late", "Tie"]);
        let generated = generate(records, &Config::default(), Utc::now()).unwrap();
        assert_eq!(titles(&generated.document), vec!["Late", "Early", "Tie"]);
    }

    #[test]
    fn test_run_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_path: dir.path().join("brisbanekids.ics"),
            ..Config::default()
        };
        let diagnostics = run(Vec::new(), &config).unwrap();
        assert_eq!(diagnostics.seen, 0);
        let written = read_to_string(&config.output_path).unwrap();
        assert!(written.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(written.ends_with("END:VCALENDAR\r\n"));
        assert!(!written.contains("BEGIN:VEVENT"));

        let records = vec![record(
            "Story Time",
            "2024-01-25T10:00:00+10:00",
            "https://example.org/story-time",
        )];
        let diagnostics = run(records, &config).unwrap();
        assert_eq!(diagnostics.accepted, 1);
        let written = read_to_string(&config.output_path).unwrap();
        assert_eq!(written.matches("BEGIN:VEVENT").count(), 1);
    }

    #[test]
    fn test_run_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_path: dir.path().join("missing").join("brisbanekids.ics"),
            ..Config::default()
        };
        assert!(run(Vec::new(), &config).is_err());
        assert!(!config.output_path.exists());
    }
}
