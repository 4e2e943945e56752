//! CTFTime catalog client.

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use shared_types::{Event, EventDetails, EventSummary};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

// The catalog sits behind an edge proxy that rejects non-browser agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ";

/// Catalog filters applied to every fetched event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventFilter {
    pub min_weight: f64,
}

/// Why an event was dropped by [`EventFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Onsite,
    Restricted,
    Underweight,
}

impl EventFilter {
    pub fn check(&self, details: &EventDetails) -> Result<(), Rejection> {
        if details.onsite {
            return Err(Rejection::Onsite);
        }
        if !details.is_open() {
            return Err(Rejection::Restricted);
        }
        if details.weight < self.min_weight {
            return Err(Rejection::Underweight);
        }
        Ok(())
    }
}

pub struct CtfTimeClient {
    http: Client,
    base_url: String,
    limit: u32,
    filter: EventFilter,
}

impl CtfTimeClient {
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| SyncError::catalog(&config.ctftime_api_url, e))?;

        Ok(Self {
            http,
            base_url: config.ctftime_api_url.trim_end_matches('/').to_string(),
            limit: config.ctftime_limit,
            filter: EventFilter {
                min_weight: config.min_weight,
            },
        })
    }

    /// Fetch upcoming events starting `lookback` before `now`, with full
    /// details, dropping onsite, restricted and underweight events.
    ///
    /// Order is the catalog's.
    pub async fn fetch_upcoming_events(
        &self,
        lookback: TimeDelta,
        now: DateTime<Utc>,
    ) -> SyncResult<Vec<Event>> {
        let start = window_start(now, lookback);
        let summaries = self.list_events(start).await?;

        let mut details = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            details.push(self.get_event(summary.id).await?);
        }

        let (events, skipped) = accept(&self.filter, details);
        tracing::info!(
            "Fetched {} CTFTime events, skipped {} events due to filters",
            events.len(),
            skipped
        );

        Ok(events)
    }

    async fn list_events(&self, start: i64) -> SyncResult<Vec<EventSummary>> {
        let url = format!("{}/", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("limit", self.limit.to_string()), ("start", start.to_string())])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SyncError::catalog(&url, e))?;

        response
            .json()
            .await
            .map_err(|e| SyncError::catalog(&url, e))
    }

    async fn get_event(&self, id: u64) -> SyncResult<EventDetails> {
        let url = format!("{}/{}/", self.base_url, id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SyncError::catalog(&url, e))?;

        response
            .json()
            .await
            .map_err(|e| SyncError::catalog(&url, e))
    }
}

/// Keep the events passing `filter` whose timestamps parse, in input order.
/// Returns them with the number dropped.
pub fn accept(filter: &EventFilter, details: Vec<EventDetails>) -> (Vec<Event>, usize) {
    let total = details.len();
    let mut events = Vec::with_capacity(total);

    for details in details {
        if let Err(reason) = filter.check(&details) {
            tracing::debug!("Skipping event {} ({}): {:?}", details.title, details.id, reason);
            continue;
        }

        let id = details.id;
        match Event::try_from(details) {
            Ok(event) => events.push(event),
            Err(e) => tracing::warn!("Skipping event {}: {}", id, e),
        }
    }

    let skipped = total - events.len();
    (events, skipped)
}

/// Unix timestamp the catalog window starts at. Negative spans look ahead.
/// Saturates at the edges of the representable range.
pub fn window_start(now: DateTime<Utc>, lookback: TimeDelta) -> i64 {
    let start = now.checked_sub_signed(lookback).unwrap_or(if lookback > TimeDelta::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    });
    start.timestamp()
}
