//! In-memory guild for exercising the reconciler.

use std::sync::{Mutex, MutexGuard};

use reqwest::StatusCode;

use super::{Category, Channel, ChannelKind, ChatGateway, NewScheduledEvent, ScheduledEvent};
use crate::error::{SyncError, SyncResult};

#[derive(Debug, Default)]
struct GuildState {
    categories: Vec<Category>,
    channels: Vec<Channel>,
    events: Vec<ScheduledEvent>,
    created_entries: Vec<NewScheduledEvent>,
    calls: Vec<String>,
    fail_on: Option<String>,
    next_id: u64,
}

impl GuildState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    /// Record a write, failing if it matches the configured failure prefix.
    fn record(&mut self, call: String) -> SyncResult<()> {
        if let Some(prefix) = &self.fail_on {
            if call.starts_with(prefix.as_str()) {
                return Err(SyncError::gateway(
                    call,
                    StatusCode::FORBIDDEN,
                    r#"{"message": "Missing Permissions", "code": 50013}"#,
                ));
            }
        }
        self.calls.push(call);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryGuild {
    state: Mutex<GuildState>,
}

impl MemoryGuild {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GuildState> {
        self.state.lock().unwrap()
    }

    pub fn add_category(&self, name: &str) -> Category {
        let mut state = self.state();
        let category = Category {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.categories.push(category.clone());
        category
    }

    pub fn add_text_channel(
        &self,
        category: &Category,
        name: &str,
        topic: Option<&str>,
        last_message_id: Option<&str>,
    ) -> Channel {
        self.add_channel(category, name, ChannelKind::Text, topic, last_message_id)
    }

    pub fn add_channel(
        &self,
        category: &Category,
        name: &str,
        kind: ChannelKind,
        topic: Option<&str>,
        last_message_id: Option<&str>,
    ) -> Channel {
        let mut state = self.state();
        let channel = Channel {
            id: state.next_id(),
            name: name.to_string(),
            kind,
            parent_id: Some(category.id.clone()),
            topic: topic.map(str::to_string),
            last_message_id: last_message_id.map(str::to_string),
        };
        state.channels.push(channel.clone());
        channel
    }

    pub fn add_scheduled_event(&self, name: &str, user_count: u32) {
        let mut state = self.state();
        let event = ScheduledEvent {
            id: state.next_id(),
            name: name.to_string(),
            user_count,
        };
        state.events.push(event);
    }

    /// Make every write whose call description starts with `prefix` fail.
    pub fn fail_on(&self, prefix: &str) {
        self.state().fail_on = Some(prefix.to_string());
    }

    /// Write calls in the order they were made, e.g. `create category Foo`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn category_names(&self) -> Vec<String> {
        self.state()
            .categories
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn channels_in(&self, category_name: &str) -> Vec<Channel> {
        let state = self.state();
        let Some(category) = state.categories.iter().find(|c| c.name == category_name) else {
            return Vec::new();
        };
        state
            .channels
            .iter()
            .filter(|c| c.parent_id.as_deref() == Some(category.id.as_str()))
            .cloned()
            .collect()
    }

    pub fn created_entries(&self) -> Vec<NewScheduledEvent> {
        self.state().created_entries.clone()
    }
}

impl ChatGateway for MemoryGuild {
    async fn list_categories(&self) -> SyncResult<Vec<Category>> {
        Ok(self.state().categories.clone())
    }

    async fn list_channels(&self, category: &Category) -> SyncResult<Vec<Channel>> {
        Ok(self
            .state()
            .channels
            .iter()
            .filter(|c| c.parent_id.as_deref() == Some(category.id.as_str()))
            .cloned()
            .collect())
    }

    async fn list_scheduled_events(&self) -> SyncResult<Vec<ScheduledEvent>> {
        Ok(self.state().events.clone())
    }

    async fn create_category(&self, name: &str) -> SyncResult<Category> {
        let mut state = self.state();
        state.record(format!("create category {}", name))?;
        let category = Category {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn create_text_channel(
        &self,
        category: &Category,
        name: &str,
        topic: &str,
    ) -> SyncResult<Channel> {
        let mut state = self.state();
        state.record(format!("create channel {} in {}", name, category.name))?;
        let channel = Channel {
            id: state.next_id(),
            name: name.to_string(),
            kind: ChannelKind::Text,
            parent_id: Some(category.id.clone()),
            topic: Some(topic.to_string()),
            last_message_id: None,
        };
        state.channels.push(channel.clone());
        Ok(channel)
    }

    async fn create_scheduled_event(
        &self,
        entry: &NewScheduledEvent,
    ) -> SyncResult<ScheduledEvent> {
        let mut state = self.state();
        state.record(format!("create scheduled event {}", entry.name))?;
        let event = ScheduledEvent {
            id: state.next_id(),
            name: entry.name.clone(),
            user_count: 0,
        };
        state.events.push(event.clone());
        state.created_entries.push(entry.clone());
        Ok(event)
    }

    async fn delete_channel(&self, channel: &Channel) -> SyncResult<()> {
        let mut state = self.state();
        state.record(format!("delete channel {}", channel.name))?;
        state.channels.retain(|c| c.id != channel.id);
        Ok(())
    }

    async fn delete_category(&self, category: &Category) -> SyncResult<()> {
        let mut state = self.state();
        state.record(format!("delete category {}", category.name))?;
        state.categories.retain(|c| c.id != category.id);
        Ok(())
    }

    async fn rename_category(&self, category: &Category, name: &str) -> SyncResult<()> {
        let mut state = self.state();
        state.record(format!("rename category {} to {}", category.name, name))?;
        if let Some(existing) = state.categories.iter_mut().find(|c| c.id == category.id) {
            existing.name = name.to_string();
        }
        Ok(())
    }
}

mod tests {
    use super::*;

    #[test]
    fn test_deleting_channel_empties_category() {
        let guild = MemoryGuild::new();
        let category = guild.add_category("Foo CTF");
        let channel = guild.add_text_channel(&category, "general", None, None);

        tokio_test::block_on(guild.delete_channel(&channel)).unwrap();

        assert!(guild.channels_in("Foo CTF").is_empty());
        assert_eq!(guild.calls(), vec!["delete channel general"]);
    }

    #[test]
    fn test_fail_on_prefix() {
        let guild = MemoryGuild::new();
        guild.fail_on("create category");

        let err = tokio_test::block_on(guild.create_category("Foo CTF")).unwrap_err();

        assert!(matches!(err, SyncError::Gateway { status, .. } if status == StatusCode::FORBIDDEN));
        assert!(guild.category_names().is_empty());
    }
}
