use thiserror::Error;

/// Errors returned by the WordPress REST client.
#[derive(Debug, Error)]
pub enum WordPressError {
    /// Transport-level failure (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No category exists for the configured slug
    #[error("category not found: {slug}")]
    CategoryNotFound { slug: String },
}

pub type Result<T> = std::result::Result<T, WordPressError>;
