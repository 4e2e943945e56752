use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;
use tokio::{signal, time};

use crate::config::SyncConfig;
use crate::ctftime::CtfTimeClient;
use crate::gateway::DiscordClient;
use crate::reconcile::{CycleReport, Reconciler};

pub struct SyncScheduler {
    config: SyncConfig,
    catalog: CtfTimeClient,
    gateway: DiscordClient,
}

impl SyncScheduler {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let catalog = CtfTimeClient::new(&config).context("Failed to create CTFTime client")?;
        let gateway = DiscordClient::new(&config).context("Failed to create Discord client")?;

        Ok(Self {
            config,
            catalog,
            gateway,
        })
    }

    /// Run once, or forever on the configured interval.
    pub async fn run(&self) -> Result<()> {
        match self.config.poll_interval {
            None => self.run_cycle().await.map(|_| ()),
            Some(interval) => self.run_periodic(interval).await,
        }
    }

    /// One full fetch, create, archive cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let now = Utc::now();

        let events = self
            .catalog
            .fetch_upcoming_events(self.config.lookback, now)
            .await
            .context("Failed to fetch CTFTime events")?;

        let report = Reconciler::new(&self.gateway, &self.config)
            .run_cycle(&events, now)
            .await
            .context("Sync cycle aborted")?;

        if report.is_noop() {
            tracing::info!("Guild already up to date");
        }

        Ok(report)
    }

    async fn run_periodic(&self, interval: Duration) -> Result<()> {
        let mut ticker = time::interval(interval);

        tracing::info!("CTF sync started (interval: {:?})", interval);

        loop {
            // Cycles always run to completion; shutdown is only honoured between them.
            tokio::select! {
                _ = ticker.tick() => {}
                _ = signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping...");
                    return Ok(());
                }
            }

            tracing::debug!("Running sync cycle");
            if let Err(e) = self.run_cycle().await {
                tracing::error!("Sync cycle failed: {:?}", e);
                // Continue polling even on error
            }
        }
    }
}
