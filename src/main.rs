mod config;
mod error;
mod report;
mod scrape;
mod server;
mod telegram;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::scrape::Scraper;
use crate::server::AppState;
use crate::telegram::TelegramClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,trafficbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded");
    info!("  Analytics base: {}", config.scrape.base_url);
    info!(
        "  Workers: {} (queue depth {})",
        config.workers.count, config.workers.queue_depth
    );

    // Worker pool behind a bounded queue
    let scraper = Arc::new(Scraper::new(config.scrape.clone()));
    let telegram = Arc::new(TelegramClient::new(config.telegram.clone()));
    let jobs = worker::spawn_pool(
        config.workers.count,
        config.workers.queue_depth,
        scraper,
        telegram,
    );

    // Run the webhook server
    server::run(AppState { jobs }, config.server.port).await
}
