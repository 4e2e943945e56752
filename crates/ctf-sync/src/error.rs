//! Error types for a sync cycle.
//!
//! Every variant aborts the running cycle. Problems scoped to a single event
//! or channel (bad timestamps, unreadable topics) never become a `SyncError`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Catalog could not be reached or returned something undecodable
    #[error("Catalog request to {url} failed: {source}")]
    Catalog {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Chat platform rejected a call
    #[error("Chat platform refused to {action} ({status}): {body}")]
    Gateway {
        action: String,
        status: StatusCode,
        body: String,
    },

    /// Transport failure talking to the chat platform
    #[error("Chat platform request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl SyncError {
    pub fn catalog(url: impl Into<String>, source: reqwest::Error) -> Self {
        SyncError::Catalog {
            url: url.into(),
            source,
        }
    }

    pub fn gateway(action: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        SyncError::Gateway {
            action: action.into(),
            status,
            body: body.into(),
        }
    }
}

/// Result type alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
