//! Catalog event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Textual timestamp format used by the catalog.
const CATALOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Entry of the paginated catalog listing. Only the id is used; the full
/// record is fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: u64,
}

/// Full event record as returned by the catalog details endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start: String,
    pub finish: String,
    /// The event's own website
    #[serde(default)]
    pub url: String,
    /// The event page on the catalog
    pub ctftime_url: String,
    pub ctf_id: u64,
    #[serde(default)]
    pub onsite: bool,
    #[serde(default)]
    pub restrictions: String,
    #[serde(default)]
    pub weight: f64,
}

impl EventDetails {
    pub fn is_open(&self) -> bool {
        self.restrictions.trim().eq_ignore_ascii_case("open")
    }
}

/// An event that passed the catalog filters, with parsed time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub ctf_id: u64,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub finish: DateTime<Utc>,
    pub url: String,
    pub ctftime_url: String,
    pub onsite: bool,
    pub restrictions: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid catalog timestamp {value:?}")]
pub struct TimestampError {
    pub value: String,
}

/// Parse a catalog timestamp such as `2024-05-18T00:00:00+00:00`.
pub fn parse_catalog_timestamp(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, CATALOG_TIMESTAMP_FORMAT))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimestampError {
            value: value.to_string(),
        })
}

impl TryFrom<EventDetails> for Event {
    type Error = TimestampError;

    fn try_from(details: EventDetails) -> Result<Self, Self::Error> {
        let start = parse_catalog_timestamp(&details.start)?;
        let finish = parse_catalog_timestamp(&details.finish)?;

        Ok(Event {
            id: details.id,
            ctf_id: details.ctf_id,
            title: details.title,
            description: details.description,
            start,
            finish,
            url: details.url,
            ctftime_url: details.ctftime_url,
            onsite: details.onsite,
            restrictions: details.restrictions,
            weight: details.weight,
        })
    }
}
