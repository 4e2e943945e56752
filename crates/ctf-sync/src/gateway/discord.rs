//! Discord REST client for the target guild.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use super::{Category, Channel, ChannelKind, ChatGateway, NewScheduledEvent, ScheduledEvent};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

const BOT_USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/matemann/ctf-sync, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

const GUILD_ONLY: u8 = 2;
const EXTERNAL_ENTITY: u8 = 3;

/// Channel object as returned by the guild channel endpoints
#[derive(Debug, Deserialize)]
struct ChannelPayload {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    last_message_id: Option<String>,
}

impl From<ChannelPayload> for Channel {
    fn from(payload: ChannelPayload) -> Self {
        Channel {
            id: payload.id,
            name: payload.name.unwrap_or_default(),
            kind: ChannelKind::from(payload.kind),
            parent_id: payload.parent_id,
            topic: payload.topic.filter(|t| !t.is_empty()),
            last_message_id: payload.last_message_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScheduledEventPayload {
    id: String,
    name: String,
    #[serde(default)]
    user_count: Option<u32>,
}

impl From<ScheduledEventPayload> for ScheduledEvent {
    fn from(payload: ScheduledEventPayload) -> Self {
        ScheduledEvent {
            id: payload.id,
            name: payload.name,
            user_count: payload.user_count.unwrap_or(0),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateChannel<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct EntityMetadata<'a> {
    location: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateScheduledEvent<'a> {
    name: &'a str,
    description: &'a str,
    scheduled_start_time: String,
    scheduled_end_time: String,
    privacy_level: u8,
    entity_type: u8,
    entity_metadata: EntityMetadata<'a>,
}

impl<'a> From<&'a NewScheduledEvent> for CreateScheduledEvent<'a> {
    fn from(entry: &'a NewScheduledEvent) -> Self {
        CreateScheduledEvent {
            name: &entry.name,
            description: &entry.description,
            scheduled_start_time: entry.start.to_rfc3339(),
            scheduled_end_time: entry.end.to_rfc3339(),
            privacy_level: GUILD_ONLY,
            entity_type: EXTERNAL_ENTITY,
            entity_metadata: EntityMetadata {
                location: &entry.location,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct RenameChannel<'a> {
    name: &'a str,
}

/// Client for one guild, authenticated as a bot
pub struct DiscordClient {
    http: Client,
    base_url: String,
    guild_id: String,
}

impl DiscordClient {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bot {}", config.bot_token))
            .context("MATEMANN_BOT_TOKEN contains invalid characters")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static(BOT_USER_AGENT));

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build Discord HTTP client")?;

        Ok(Self {
            http,
            base_url: config.discord_api_url.trim_end_matches('/').to_string(),
            guild_id: config.guild_id.clone(),
        })
    }

    fn guild_url(&self, path: &str) -> String {
        format!("{}/guilds/{}/{}", self.base_url, self.guild_id, path)
    }

    fn channel_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}", self.base_url, channel_id)
    }

    async fn send(&self, action: &str, request: RequestBuilder) -> SyncResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SyncError::gateway(action, status, body))
    }

    async fn guild_channels(&self) -> SyncResult<Vec<Channel>> {
        let response = self
            .send("list channels", self.http.get(self.guild_url("channels")))
            .await?;
        let payloads: Vec<ChannelPayload> = response.json().await?;
        Ok(payloads.into_iter().map(Channel::from).collect())
    }
}

impl ChatGateway for DiscordClient {
    async fn list_categories(&self) -> SyncResult<Vec<Category>> {
        Ok(self
            .guild_channels()
            .await?
            .into_iter()
            .filter(|c| c.kind == ChannelKind::Category)
            .map(|c| Category {
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    async fn list_channels(&self, category: &Category) -> SyncResult<Vec<Channel>> {
        Ok(self
            .guild_channels()
            .await?
            .into_iter()
            .filter(|c| c.parent_id.as_deref() == Some(category.id.as_str()))
            .collect())
    }

    async fn list_scheduled_events(&self) -> SyncResult<Vec<ScheduledEvent>> {
        let request = self
            .http
            .get(self.guild_url("scheduled-events"))
            .query(&[("with_user_count", "true")]);
        let response = self.send("list scheduled events", request).await?;
        let payloads: Vec<ScheduledEventPayload> = response.json().await?;
        Ok(payloads.into_iter().map(ScheduledEvent::from).collect())
    }

    async fn create_category(&self, name: &str) -> SyncResult<Category> {
        let body = CreateChannel {
            name,
            kind: 4,
            parent_id: None,
            topic: None,
        };
        let request = self.http.post(self.guild_url("channels")).json(&body);
        let response = self
            .send(&format!("create category {}", name), request)
            .await?;
        let payload: ChannelPayload = response.json().await?;
        let channel = Channel::from(payload);

        Ok(Category {
            id: channel.id,
            name: channel.name,
        })
    }

    async fn create_text_channel(
        &self,
        category: &Category,
        name: &str,
        topic: &str,
    ) -> SyncResult<Channel> {
        let body = CreateChannel {
            name,
            kind: 0,
            parent_id: Some(category.id.as_str()),
            topic: Some(topic),
        };
        let request = self.http.post(self.guild_url("channels")).json(&body);
        let response = self
            .send(
                &format!("create channel {} in {}", name, category.name),
                request,
            )
            .await?;
        let payload: ChannelPayload = response.json().await?;

        Ok(Channel::from(payload))
    }

    async fn create_scheduled_event(
        &self,
        entry: &NewScheduledEvent,
    ) -> SyncResult<ScheduledEvent> {
        let body = CreateScheduledEvent::from(entry);
        let request = self
            .http
            .post(self.guild_url("scheduled-events"))
            .json(&body);
        let response = self
            .send(&format!("create scheduled event {}", entry.name), request)
            .await?;
        let payload: ScheduledEventPayload = response.json().await?;

        Ok(ScheduledEvent::from(payload))
    }

    async fn delete_channel(&self, channel: &Channel) -> SyncResult<()> {
        let request = self.http.delete(self.channel_url(&channel.id));
        self.send(&format!("delete channel {}", channel.name), request)
            .await?;
        Ok(())
    }

    async fn delete_category(&self, category: &Category) -> SyncResult<()> {
        let request = self.http.delete(self.channel_url(&category.id));
        self.send(&format!("delete category {}", category.name), request)
            .await?;
        Ok(())
    }

    async fn rename_category(&self, category: &Category, name: &str) -> SyncResult<()> {
        let request = self
            .http
            .patch(self.channel_url(&category.id))
            .json(&RenameChannel { name });
        self.send(&format!("rename category {}", category.name), request)
            .await?;
        Ok(())
    }
}
