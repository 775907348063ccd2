use serde::Deserialize;

/// Opaque custom-field bag as returned by the ACF REST integration.
///
/// Values arrive untyped (booleans, numbers, and strings are all used
/// interchangeably by field plugins), so callers coerce as needed.
pub type FieldBag = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Deserialize)]
pub struct Category {
    pub id: i64,
}

/// Raw post payload from `/wp-json/wp/v2/posts`.
#[derive(Debug, Deserialize)]
pub struct Post {
    pub id: i64,
    #[serde(default)]
    pub title: RenderedText,
    #[serde(default)]
    pub acf: Option<FieldBag>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RenderedText {
    #[serde(default)]
    pub rendered: String,
}

/// One catalog entry: a published post plus its custom-field bag.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: i64,
    pub title: String,
    pub fields: FieldBag,
}

impl From<Post> for CatalogEntry {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title.rendered,
            fields: post.acf.unwrap_or_default(),
        }
    }
}

/// Result of a field write.
///
/// `Accepted` means the store acknowledged the request. It is NOT a
/// persistence guarantee: some hosted WordPress platforms accept ACF
/// writes without persisting them, and the two cases are
/// indistinguishable from the response alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Accepted,
    Rejected,
}

impl WriteOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, WriteOutcome::Accepted)
    }
}
