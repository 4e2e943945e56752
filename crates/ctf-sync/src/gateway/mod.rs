//! Chat platform access used by the reconciler.
//!
//! The reconciler only sees [`ChatGateway`]; the production implementation
//! talks to the Discord REST API.

mod discord;
#[cfg(test)]
pub mod memory;

pub use discord::DiscordClient;

use chrono::{DateTime, Utc};

use crate::error::SyncResult;

/// Kind of a guild channel, as far as the sync cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Category,
    Other,
}

impl From<u8> for ChannelKind {
    fn from(value: u8) -> Self {
        match value {
            0 => ChannelKind::Text,
            4 => ChannelKind::Category,
            _ => ChannelKind::Other,
        }
    }
}

/// A channel category grouping one event's channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
    pub parent_id: Option<String>,
    pub topic: Option<String>,
    /// `None` when nobody ever posted in the channel
    pub last_message_id: Option<String>,
}

/// A scheduled guild event with its interest count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub id: String,
    pub name: String,
    pub user_count: u32,
}

/// Input for creating a scheduled guild event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduledEvent {
    pub name: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
}

/// Remote operations on the target guild. Every call may fail; callers treat
/// failures as fatal for the current cycle.
#[allow(async_fn_in_trait)]
pub trait ChatGateway {
    async fn list_categories(&self) -> SyncResult<Vec<Category>>;

    async fn list_channels(&self, category: &Category) -> SyncResult<Vec<Channel>>;

    /// Scheduled events including their interested-user counts.
    async fn list_scheduled_events(&self) -> SyncResult<Vec<ScheduledEvent>>;

    async fn create_category(&self, name: &str) -> SyncResult<Category>;

    async fn create_text_channel(
        &self,
        category: &Category,
        name: &str,
        topic: &str,
    ) -> SyncResult<Channel>;

    async fn create_scheduled_event(&self, entry: &NewScheduledEvent)
        -> SyncResult<ScheduledEvent>;

    async fn delete_channel(&self, channel: &Channel) -> SyncResult<()>;

    async fn delete_category(&self, category: &Category) -> SyncResult<()>;

    async fn rename_category(&self, category: &Category, name: &str) -> SyncResult<()>;
}
