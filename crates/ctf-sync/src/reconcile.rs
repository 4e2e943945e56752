//! Reconciliation of catalog events against the guild.
//!
//! A cycle runs three passes in order:
//! 1. a scheduled guild event for every catalog event,
//! 2. a category with the default channel set for every event somebody is
//!    interested in,
//! 3. an archival sweep deleting quiet channels of finished events and
//!    deleting or archiving their categories.
//!
//! Nothing is persisted between cycles. Every create first looks for an
//! existing object with the same display key, so re-running a cycle against
//! unchanged guild state performs no writes.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use shared_types::{
    display_key, truncate_chars, ChannelTopic, Event, DEFAULT_CHANNELS, DESCRIPTION_LIMIT,
};

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::gateway::{Category, ChannelKind, ChatGateway, NewScheduledEvent};

/// A write performed against the guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreatedCalendarEntry { title: String },
    CreatedCategory { title: String },
    CreatedChannel { category: String, channel: String },
    DeletedChannel { category: String, channel: String },
    DeletedCategory { name: String },
    ArchivedCategory { from: String, to: String },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreatedCalendarEntry { title } => write!(f, "created event {}", title),
            Action::CreatedCategory { title } => write!(f, "created category {}", title),
            Action::CreatedChannel { category, channel } => {
                write!(f, "created channel {} in {}", channel, category)
            }
            Action::DeletedChannel { category, channel } => {
                write!(f, "deleted channel {} in {}", channel, category)
            }
            Action::DeletedCategory { name } => write!(f, "deleted category {}", name),
            Action::ArchivedCategory { from, to } => write!(f, "archived category {} as {}", from, to),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    CalendarEntryExists,
    /// The platform refuses scheduled events starting in the past
    AlreadyStarted,
    CategoryExists,
    NoInterest,
    /// Some channel's event has not passed its archive date yet
    StillActive,
    AlreadyArchived,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub subject: String,
    pub reason: SkipReason,
}

/// What a cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub actions: Vec<Action>,
    pub skips: Vec<Skip>,
}

impl CycleReport {
    fn act(&mut self, action: Action) {
        self.actions.push(action);
    }

    fn skip(&mut self, subject: &str, reason: SkipReason) {
        self.skips.push(Skip {
            subject: subject.to_string(),
            reason,
        });
    }

    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }

    fn log_summary(&self) {
        let count = |f: fn(&Action) -> bool| self.actions.iter().filter(|a| f(a)).count();
        tracing::info!(
            calendar_entries = count(|a| matches!(a, Action::CreatedCalendarEntry { .. })),
            categories = count(|a| matches!(a, Action::CreatedCategory { .. })),
            channels = count(|a| matches!(a, Action::CreatedChannel { .. })),
            deleted_channels = count(|a| matches!(a, Action::DeletedChannel { .. })),
            deleted_categories = count(|a| matches!(a, Action::DeletedCategory { .. })),
            archived_categories = count(|a| matches!(a, Action::ArchivedCategory { .. })),
            skipped = self.skips.len(),
            "Sync cycle finished"
        );
        for action in &self.actions {
            tracing::debug!("{}", action);
        }
        for skip in &self.skips {
            tracing::debug!("skipped {}: {:?}", skip.subject, skip.reason);
        }
    }
}

pub struct Reconciler<'a, G> {
    gateway: &'a G,
    config: &'a SyncConfig,
}

impl<'a, G: ChatGateway> Reconciler<'a, G> {
    pub fn new(gateway: &'a G, config: &'a SyncConfig) -> Self {
        Self { gateway, config }
    }

    /// Run all passes for `events` as of `now`. Any gateway failure aborts the
    /// cycle; writes already made are not rolled back.
    pub async fn run_cycle(&self, events: &[Event], now: DateTime<Utc>) -> SyncResult<CycleReport> {
        let mut report = CycleReport::default();

        self.create_calendar_entries(events, now, &mut report).await?;
        tracing::info!("Events successfully created");

        self.create_categories(events, &mut report).await?;
        tracing::info!("Categories and channels successfully created");

        self.sweep_categories(now, &mut report).await?;
        tracing::info!("Old categories and channels successfully deleted / archived");

        report.log_summary();
        Ok(report)
    }

    /// Create a scheduled guild event for every event that has none yet.
    pub async fn create_calendar_entries(
        &self,
        events: &[Event],
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> SyncResult<()> {
        let existing = self.gateway.list_scheduled_events().await?;
        let mut known: HashSet<String> = existing
            .iter()
            .map(|e| display_key(&e.name).to_string())
            .collect();

        for event in events {
            let key = display_key(&event.title);
            if known.contains(key) {
                tracing::info!("Event '{}' already exists, skipping", event.title);
                report.skip(&event.title, SkipReason::CalendarEntryExists);
                continue;
            }
            if event.start <= now {
                tracing::info!("Event '{}' already started, skipping", event.title);
                report.skip(&event.title, SkipReason::AlreadyStarted);
                continue;
            }

            let entry = calendar_entry(event);
            let created = self.gateway.create_scheduled_event(&entry).await?;
            tracing::info!(
                "Created event {} (catalog id: {}, guild event id: {})",
                event.title,
                event.id,
                created.id
            );

            known.insert(key.to_string());
            report.act(Action::CreatedCalendarEntry {
                title: event.title.clone(),
            });
        }

        Ok(())
    }

    /// Create a category plus default channels for every event that has no
    /// category yet and, unless the interest gate is off, at least one
    /// interested member.
    pub async fn create_categories(
        &self,
        events: &[Event],
        report: &mut CycleReport,
    ) -> SyncResult<()> {
        let entries = self.gateway.list_scheduled_events().await?;
        let mut categories = self.gateway.list_categories().await?;

        for event in events {
            let key = display_key(&event.title);

            if let Some(category) = categories.iter().find(|c| display_key(&c.name) == key) {
                tracing::info!("Category {} already exists, skipping", event.title);
                report.skip(&event.title, SkipReason::CategoryExists);
                if self.config.repair_channels {
                    self.create_channels(category, event, report).await?;
                }
                continue;
            }

            if self.config.require_interest {
                let interested = entries
                    .iter()
                    .find(|e| display_key(&e.name) == key)
                    .map_or(0, |e| e.user_count);
                if interested == 0 {
                    tracing::info!("Skipping category creation for {}: nobody interested", event.title);
                    report.skip(&event.title, SkipReason::NoInterest);
                    continue;
                }
            }

            let category = self.gateway.create_category(&event.title).await?;
            tracing::info!("Created category {} (catalog id: {})", event.title, event.id);
            report.act(Action::CreatedCategory {
                title: event.title.clone(),
            });

            self.create_channels(&category, event, report).await?;
            categories.push(category);
        }

        Ok(())
    }

    /// Create every default channel missing from `category`, each carrying
    /// the encoded topic of `event`.
    pub async fn create_channels(
        &self,
        category: &Category,
        event: &Event,
        report: &mut CycleReport,
    ) -> SyncResult<()> {
        let existing = self.gateway.list_channels(category).await?;
        let present: HashSet<&str> = existing.iter().map(|c| display_key(&c.name)).collect();

        for label in DEFAULT_CHANNELS {
            if present.contains(label) {
                continue;
            }

            let topic = ChannelTopic::encode(label, event);
            self.gateway
                .create_text_channel(category, label, &topic)
                .await?;
            tracing::info!("Created channel {} in category {}", label, category.name);
            report.act(Action::CreatedChannel {
                category: category.name.clone(),
                channel: label.to_string(),
            });
        }

        Ok(())
    }

    /// Delete never-used channels of finished events, then delete emptied
    /// categories and archive the rest. Archived categories are left alone.
    pub async fn sweep_categories(
        &self,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> SyncResult<()> {
        let grace = self.config.archive_after;
        let categories = self.gateway.list_categories().await?;

        for category in &categories {
            if category.name.starts_with(&self.config.archive_prefix) {
                report.skip(&category.name, SkipReason::AlreadyArchived);
                continue;
            }

            let channels = self.gateway.list_channels(category).await?;
            let mut latest_end: Option<DateTime<Utc>> = None;
            let mut deleted_any = false;

            for channel in &channels {
                if channel.kind != ChannelKind::Text {
                    continue;
                }
                let Some(topic) = channel.topic.as_deref() else {
                    continue;
                };
                let decoded = match ChannelTopic::decode(topic) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        tracing::debug!("Ignoring topic of {} in {}: {}", channel.name, category.name, e);
                        continue;
                    }
                };
                let Some(finish) = DateTime::from_timestamp(decoded.finish, 0) else {
                    continue;
                };

                let Some(end) = finish.checked_add_signed(grace) else {
                    tracing::debug!("Ignoring {} in {}: end time out of range", channel.name, category.name);
                    continue;
                };
                latest_end = Some(latest_end.map_or(end, |latest| latest.max(end)));

                if end > now {
                    continue;
                }

                if channel.last_message_id.is_none() {
                    self.gateway.delete_channel(channel).await?;
                    tracing::info!("Deleted channel {} in {}", channel.name, category.name);
                    deleted_any = true;
                    report.act(Action::DeletedChannel {
                        category: category.name.clone(),
                        channel: channel.name.clone(),
                    });
                }
            }

            let Some(end) = latest_end else {
                continue;
            };
            if end > now {
                report.skip(&category.name, SkipReason::StillActive);
                continue;
            }

            let remaining = if deleted_any {
                self.gateway.list_channels(category).await?.len()
            } else {
                channels.len()
            };

            if remaining == 0 {
                self.gateway.delete_category(category).await?;
                tracing::info!("Deleted category {}", category.name);
                report.act(Action::DeletedCategory {
                    name: category.name.clone(),
                });
            } else {
                let archived = format!("{}{}", self.config.archive_prefix, category.name);
                self.gateway.rename_category(category, &archived).await?;
                tracing::info!("Archived category {} as {}", category.name, archived);
                report.act(Action::ArchivedCategory {
                    from: category.name.clone(),
                    to: archived,
                });
            }
        }

        Ok(())
    }
}

fn calendar_entry(event: &Event) -> NewScheduledEvent {
    let location = if event.url.trim().is_empty() {
        &event.ctftime_url
    } else {
        &event.url
    };

    NewScheduledEvent {
        name: event.title.clone(),
        description: truncate_chars(&event.description, DESCRIPTION_LIMIT).to_string(),
        start: event.start,
        end: event.finish,
        location: location.clone(),
    }
}
