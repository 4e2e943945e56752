mod config;
mod ctftime;
mod error;
mod gateway;
mod reconcile;
mod scheduler;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::SyncConfig;
use crate::scheduler::SyncScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG from it applies
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ctf_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CTF sync");

    let config = SyncConfig::from_env()?;
    let scheduler = SyncScheduler::new(config)?;

    scheduler.run().await?;

    tracing::info!("I'm done here. Goodbye.");
    Ok(())
}
