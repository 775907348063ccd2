use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

/// Scraper configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub wp_url: String,
    pub wp_username: String,
    pub wp_password: String,
    pub category_slug: String,
    pub plugin_endpoint: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub min_hours: u32,
    pub cache_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            wp_url: env::var("WP_URL").context("WP_URL must be set")?,
            wp_username: env::var("WP_USERNAME").context("WP_USERNAME must be set")?,
            wp_password: env::var("WP_PASSWORD").context("WP_PASSWORD must be set")?,
            category_slug: env::var("WP_CATEGORY_SLUG")
                .unwrap_or_else(|_| "ai-review".to_string()),
            plugin_endpoint: env::var("WP_PLUGIN_ENDPOINT").ok(),
            user_agent: env::var("SCRAPER_USER_AGENT")
                .unwrap_or_else(|_| "Mozilla/5.0 (compatible; CatalogScraper/1.0)".to_string()),
            timeout_secs: env::var("SCRAPER_TIMEOUT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("SCRAPER_TIMEOUT must be a valid number")?,
            min_hours: env::var("SCRAPER_MIN_HOURS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("SCRAPER_MIN_HOURS must be a valid number")?,
            cache_dir: env::var("SCRAPER_CACHE_DIR")
                .unwrap_or_else(|_| "cache".to_string())
                .into(),
        })
    }
}
