// Entry point for one catalog scrape batch

use anyhow::{Context, Result};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_scraper::{Config, FileCache, HttpExtractor, Runner, ScrapeEngine};
use wordpress_client::WordPressClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,catalog_scraper=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting catalog scraper");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(category = %config.category_slug, "Configuration loaded");

    let mut store = WordPressClient::new(&config.wp_url, &config.wp_username, &config.wp_password)
        .context("Failed to build WordPress client")?;
    if let Some(endpoint) = &config.plugin_endpoint {
        store = store.with_plugin_endpoint(endpoint);
    }

    let cache = FileCache::new(&config.cache_dir)
        .with_context(|| format!("Failed to open snapshot cache at {}", config.cache_dir.display()))?;
    let extractor = HttpExtractor::new(
        &config.user_agent,
        Duration::from_secs(config.timeout_secs),
    )
    .context("Failed to build HTTP extractor")?;

    let runner = Runner::new(store, ScrapeEngine::new(extractor, cache), config.min_hours);
    let summary = runner.run(&config.category_slug).await?;

    tracing::info!(
        updated = summary.updated,
        skipped = summary.skipped,
        errored = summary.errored,
        total = summary.total,
        "Catalog scrape finished"
    );

    Ok(())
}
