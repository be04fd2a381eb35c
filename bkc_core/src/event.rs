use chrono::{DateTime, FixedOffset};

/// A validated event, ready to be written to a calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Stable across runs, see [`crate::normalizer::uid`].
    pub uid: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    /// Never before `start`.
    pub end: DateTime<FixedOffset>,
    /// Empty if the posting had no location.
    pub location_text: String,
    /// Newlines are kept, escaping happens on serialization.
    pub description_text: String,
    pub url: Option<String>,
}
