use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::classify::topics::Topic;

// ============================================================================
// Error Types
// ============================================================================

/// Storage-layer errors. The orchestrator treats every repository call as
/// fallible but non-fatal per call.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database migration failed: {0}")]
    Migration(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Domain Types
// ============================================================================

/// Kind of registered source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Blog,
    Slide,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Blog => "blog",
            SourceKind::Slide => "slide",
        }
    }

    fn from_str(s: &str) -> SourceKind {
        match s {
            "slide" => SourceKind::Slide,
            _ => SourceKind::Blog,
        }
    }
}

/// A registered RSS/Atom endpoint. The URL is unique and normalized before
/// it ever reaches storage.
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub kind: SourceKind,
    pub official: bool,
    pub bookmark_total: i64,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted feed entry. `url` is the sole dedup key; `bookmark_count`
/// is `None` until the first popularity fetch (distinct from a genuine 0).
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub published_at: DateTime<Utc>,
    pub score: Option<f64>,
    pub topic_main: Option<Topic>,
    pub topic_sub: Option<Topic>,
    pub bookmark_count: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new post; only the orchestrator (and registration
/// import) constructs these.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub source_id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub published_at: DateTime<Utc>,
    pub score: Option<f64>,
    pub topic_main: Option<Topic>,
    pub topic_sub: Option<Topic>,
}

// ============================================================================
// Row Types
// ============================================================================

/// Timestamps are stored as epoch milliseconds; cursors round-trip at
/// millisecond precision.
pub(crate) fn datetime_from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SourceRow {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub kind: String,
    pub official: bool,
    pub bookmark_total: i64,
    pub user_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SourceRow {
    pub(crate) fn into_source(self) -> FeedSource {
        FeedSource {
            id: self.id,
            url: self.url,
            title: self.title,
            description: self.description,
            site_url: self.site_url,
            kind: SourceKind::from_str(&self.kind),
            official: self.official,
            bookmark_total: self.bookmark_total,
            user_id: self.user_id,
            created_at: datetime_from_millis(self.created_at),
            updated_at: datetime_from_millis(self.updated_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub published_at: i64,
    pub score: Option<f64>,
    pub topic_main: Option<String>,
    pub topic_sub: Option<String>,
    pub bookmark_count: Option<i64>,
    pub created_at: i64,
}

impl PostRow {
    pub(crate) fn into_post(self) -> Post {
        Post {
            id: self.id,
            source_id: self.source_id,
            title: self.title,
            summary: self.summary,
            url: self.url,
            thumbnail: self.thumbnail,
            published_at: datetime_from_millis(self.published_at),
            score: self.score,
            topic_main: self.topic_main.as_deref().and_then(Topic::from_slug),
            topic_sub: self.topic_sub.as_deref().and_then(Topic::from_slug),
            bookmark_count: self.bookmark_count,
            created_at: datetime_from_millis(self.created_at),
        }
    }
}
