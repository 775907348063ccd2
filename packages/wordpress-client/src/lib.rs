//! Pure WordPress REST API client.
//!
//! A minimal client for the WordPress REST API with ACF custom-field
//! support. Authenticates with an Application Password (Basic auth,
//! RFC 7617), lists published posts in a category, and reads/writes a
//! post's custom-field bag.
//!
//! # Example
//!
//! ```rust,ignore
//! use wordpress_client::WordPressClient;
//!
//! let wp = WordPressClient::new("https://example.com", "editor", "abcd efgh ijkl mnop qrst uvwx")?;
//!
//! for entry in wp.list_entries("ai-review").await? {
//!     println!("{} ({})", entry.title, entry.id);
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{Result, WordPressError};
pub use types::{CatalogEntry, FieldBag, WriteOutcome};

use std::time::Duration;

use types::{Category, Post};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WordPressClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    plugin_endpoint: Option<String>,
}

impl WordPressClient {
    /// Create a client for the given site.
    ///
    /// The site URL is forced to https and the application password is
    /// stripped of the display spacing WordPress inserts when showing it.
    pub fn new(url: &str, username: &str, app_password: &str) -> Result<Self> {
        let base_url = url
            .trim_end_matches('/')
            .replacen("http://", "https://", 1);

        let password: String = app_password
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "application/json".parse().expect("valid header"),
        );

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("catalog-scraper/1.0")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url,
            username: username.to_string(),
            password,
            plugin_endpoint: None,
        })
    }

    /// Route field writes through a custom plugin endpoint
    /// (e.g. `/wp-json/ai-tools/v1/update`), with the core posts
    /// endpoint kept as fallback.
    pub fn with_plugin_endpoint(mut self, endpoint: &str) -> Self {
        self.plugin_endpoint = Some(endpoint.trim_end_matches('/').to_string());
        self
    }

    /// Look up a category id by slug.
    pub async fn category_id(&self, slug: &str) -> Result<Option<i64>> {
        let url = format!("{}/wp-json/wp/v2/categories", self.base_url);
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("slug", slug), ("per_page", "1")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WordPressError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let categories: Vec<Category> = resp.json().await?;
        Ok(categories.first().map(|c| c.id))
    }

    /// List all published posts in a category, with their field bags.
    pub async fn list_entries(&self, category_slug: &str) -> Result<Vec<CatalogEntry>> {
        let category_id = self
            .category_id(category_slug)
            .await?
            .ok_or_else(|| WordPressError::CategoryNotFound {
                slug: category_slug.to_string(),
            })?;

        let url = format!("{}/wp-json/wp/v2/posts", self.base_url);
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[
                ("categories", category_id.to_string().as_str()),
                ("per_page", "100"),
                ("status", "publish"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WordPressError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let posts: Vec<Post> = resp.json().await?;
        tracing::info!(
            category = category_slug,
            count = posts.len(),
            "Fetched catalog entries"
        );

        Ok(posts.into_iter().map(CatalogEntry::from).collect())
    }

    /// Read the custom-field bag for a single post.
    ///
    /// Posts without ACF data yield an empty bag.
    pub async fn fields(&self, post_id: i64) -> Result<FieldBag> {
        let url = format!("{}/wp-json/wp/v2/posts/{}", self.base_url, post_id);
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WordPressError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let post: Post = resp.json().await?;
        Ok(post.acf.unwrap_or_default())
    }

    /// Write custom fields for a post. Best-effort: a success status means
    /// the request was accepted, not that the values persisted.
    pub async fn set_fields(&self, post_id: i64, fields: &FieldBag) -> Result<WriteOutcome> {
        let body = serde_json::json!({ "acf": fields });

        // Preferred path: custom plugin endpoint, if configured
        if let Some(plugin) = &self.plugin_endpoint {
            let url = format!("{}/{}", plugin, post_id);
            match self.client
                .post(&url)
                .basic_auth(&self.username, Some(&self.password))
                .json(&body)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(post_id, endpoint = "plugin", "Fields updated");
                    return Ok(WriteOutcome::Accepted);
                }
                Ok(resp) => {
                    tracing::warn!(
                        post_id,
                        status = resp.status().as_u16(),
                        "Plugin endpoint refused write, falling back to core REST API"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        post_id,
                        error = %e,
                        "Plugin endpoint unreachable, falling back to core REST API"
                    );
                }
            }
        }

        // Fallback: built-in posts endpoint (ACF exposed via /wp/v2/posts)
        let url = format!("{}/wp-json/wp/v2/posts/{}", self.base_url, post_id);
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            tracing::debug!(post_id, field_count = fields.len(), "Fields updated");
            Ok(WriteOutcome::Accepted)
        } else {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(
                post_id,
                status = status.as_u16(),
                body = %body,
                "Field write rejected"
            );
            Ok(WriteOutcome::Rejected)
        }
    }
}
