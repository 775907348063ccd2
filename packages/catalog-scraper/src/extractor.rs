//! Field extraction: fetch a page and pull semantic fields out of it with
//! the entry's configured CSS selectors.
//!
//! One unreachable target must not abort a batch, so a failed fetch
//! yields an empty snapshot and a log line rather than an error.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::types::{SelectorConfig, SemanticField, Snapshot};

/// Domain-substring to canonical-owner table used when no owner selector
/// yields a value. An input to the extractor, not something it infers.
pub const DEFAULT_OWNER_DOMAINS: &[(&str, &str)] = &[
    ("google.com", "Google"),
    ("openai.com", "OpenAI"),
    ("anthropic.com", "Anthropic"),
    ("cursor.sh", "Cursor"),
    ("cursor.com", "Cursor"),
];

/// Attributes tried, in order, for link-like fields.
const LINK_ATTRS: [&str; 3] = ["src", "href", "data-src"];

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extract the semantic fields from `url`.
    ///
    /// An empty snapshot signals a fetch-level failure; a failing selector
    /// degrades only its own field.
    async fn extract(&self, url: &str, selectors: &SelectorConfig) -> Snapshot;
}

#[async_trait]
impl<T: FieldExtractor + ?Sized> FieldExtractor for std::sync::Arc<T> {
    async fn extract(&self, url: &str, selectors: &SelectorConfig) -> Snapshot {
        (**self).extract(url, selectors).await
    }
}

/// Extractor backed by a plain HTTP GET and CSS selection over the body.
pub struct HttpExtractor {
    client: reqwest::Client,
    owner_domains: Vec<(String, String)>,
}

impl HttpExtractor {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .parse()
                .expect("valid header"),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "en-US,en;q=0.5".parse().expect("valid header"),
        );
        headers.insert(
            reqwest::header::CONNECTION,
            "keep-alive".parse().expect("valid header"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            owner_domains: DEFAULT_OWNER_DOMAINS
                .iter()
                .map(|(domain, owner)| (domain.to_string(), owner.to_string()))
                .collect(),
        })
    }

    /// Replace the owner-domain fallback table.
    pub fn with_owner_domains(mut self, domains: &[(&str, &str)]) -> Self {
        self.owner_domains = domains
            .iter()
            .map(|(domain, owner)| (domain.to_string(), owner.to_string()))
            .collect();
        self
    }

    async fn fetch_html(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        response.text().await
    }

    /// Pull the configured fields out of an already-fetched document.
    pub fn extract_from_html(
        &self,
        page_url: &str,
        html: &str,
        selectors: &SelectorConfig,
    ) -> Snapshot {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();
        let mut snapshot = Snapshot::new();

        for field in SemanticField::ALL {
            let Some(selector) = selectors.get(field) else {
                continue;
            };
            let value = if field.is_link() {
                select_link(&document, selector, base.as_ref())
            } else {
                select_text(&document, selector)
            };
            if let Some(value) = value {
                snapshot.set(field, value);
            }
        }

        // Fallbacks apply only when selector-based extraction came up empty
        if snapshot.get(SemanticField::Owner).is_none() {
            if let Some(owner) = self.owner_from_domain(base.as_ref()) {
                debug!(url = page_url, owner = %owner, "Owner inferred from domain");
                snapshot.set(SemanticField::Owner, owner);
            }
        }
        if snapshot.get(SemanticField::ProductWebsite).is_none() {
            if let Some(site) = base.as_ref().and_then(site_url) {
                snapshot.set(SemanticField::ProductWebsite, site);
            }
        }

        snapshot
    }

    fn owner_from_domain(&self, base: Option<&Url>) -> Option<String> {
        let host = base?.host_str()?;
        self.owner_domains
            .iter()
            .find(|(domain, _)| host.contains(domain.as_str()))
            .map(|(_, owner)| owner.clone())
    }
}

#[async_trait]
impl FieldExtractor for HttpExtractor {
    async fn extract(&self, url: &str, selectors: &SelectorConfig) -> Snapshot {
        debug!(url, "Fetching page");
        let html = match self.fetch_html(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url, error = %e, "Fetch failed, no fields extracted");
                return Snapshot::new();
            }
        };
        let snapshot = self.extract_from_html(url, &html, selectors);
        debug!(url, fields = snapshot.len(), "Extraction complete");
        snapshot
    }
}

/// First matching element's text, whitespace-normalized.
fn select_text(document: &Html, selector: &str) -> Option<String> {
    let parsed = match Selector::parse(selector) {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(selector, "Unparsable selector, field skipped");
            return None;
        }
    };

    let element = document.select(&parsed).next()?;
    let text: String = element.text().collect::<Vec<_>>().join(" ");
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!normalized.is_empty()).then_some(normalized)
}

/// First matching element's `src`/`href`/`data-src` attribute, resolved to
/// an absolute URL.
fn select_link(document: &Html, selector: &str, base: Option<&Url>) -> Option<String> {
    let parsed = match Selector::parse(selector) {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(selector, "Unparsable selector, field skipped");
            return None;
        }
    };

    let element = document.select(&parsed).next()?;
    let raw = LINK_ATTRS
        .iter()
        .copied()
        .find_map(|attr| element.value().attr(attr))?;
    Some(resolve_link(raw, base))
}

/// Protocol-relative links get https; site-relative ones resolve against
/// the page URL; everything else passes through unchanged.
fn resolve_link(raw: &str, base: Option<&Url>) -> String {
    if raw.starts_with("//") {
        format!("https:{raw}")
    } else if raw.starts_with('/') {
        match base {
            Some(base) => base
                .join(raw)
                .map(|resolved| resolved.to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => raw.to_string(),
        }
    } else {
        raw.to_string()
    }
}

/// Scheme + host of a page URL, with path, query, and fragment stripped.
fn site_url(url: &Url) -> Option<String> {
    url.host_str()
        .map(|host| format!("{}://{}", url.scheme(), host))
}
