//! This crate turns Brisbane Kids event postings into an iCalendar feed.
//! The binaries `bkc_cli` and `bkc_server` write the feed to a file or serve it over HTTP.
//!
//! The postings are the schema.org `Event` records embedded in the pages of
//! <https://brisbanekids.com.au/events/>; fetching them is left to the caller.

pub use chrono;
pub use ical;

pub mod config;
pub mod error;
pub mod event;
pub mod normalizer;
pub mod persist;
pub mod pipeline;
pub mod record;
pub mod serializer;

pub use config::{Config, LocationFields, SortPolicy, TimestampStyle};
pub use error::{Error, Result};
pub use event::Event;
pub use normalizer::{normalize, Diagnostics, Normalized, Outcome, RejectReason, Rejection};
pub use pipeline::{generate, run, Generated};
pub use record::{load_records, parse_records, RawEventRecord};
