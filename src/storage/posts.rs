use chrono::{DateTime, Duration, Utc};

use super::schema::Database;
use super::types::{NewPost, Post, PostRow, StorageError};

const POST_COLUMNS: &str = "id, source_id, title, summary, url, thumbnail, published_at, \
                            score, topic_main, topic_sub, bookmark_count, created_at";

impl Database {
    /// Dedup lookup by article URL, the sole dedup key.
    pub async fn find_post_by_url(&self, url: &str) -> Result<Option<Post>, StorageError> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE url = ?"))
                .bind(url)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.map(PostRow::into_post))
    }

    /// Insert a new post. `bookmark_count` starts NULL ("not yet fetched").
    /// The UNIQUE constraint on `url` makes a racing duplicate insert fail
    /// rather than double-store.
    pub async fn insert_post(&self, post: &NewPost) -> Result<i64, StorageError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (source_id, title, summary, url, thumbnail, published_at,
                               score, topic_main, topic_sub, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(post.source_id)
        .bind(&post.title)
        .bind(&post.summary)
        .bind(&post.url)
        .bind(&post.thumbnail)
        .bind(post.published_at.timestamp_millis())
        .bind(post.score)
        .bind(post.topic_main.map(|t| t.slug()))
        .bind(post.topic_sub.map(|t| t.slug()))
        .bind(Utc::now().timestamp_millis())
        .fetch_one(self.pool())
        .await?;
        Ok(id)
    }

    pub async fn update_post_bookmark_count(
        &self,
        post_id: i64,
        count: i64,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE posts SET bookmark_count = ? WHERE id = ?")
            .bind(count)
            .bind(post_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Posts due for a popularity refresh: never fetched (NULL count) or
    /// published inside the refresh window. Capped to keep a run inside its
    /// wall-clock budget.
    pub async fn list_posts_for_reconciliation(
        &self,
        window: Duration,
        cap: u32,
    ) -> Result<Vec<Post>, StorageError> {
        let cutoff = (Utc::now() - window).timestamp_millis();
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts
            WHERE bookmark_count IS NULL OR published_at >= ?
            ORDER BY published_at DESC
            LIMIT ?
            "#
        ))
        .bind(cutoff)
        .bind(cap)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(PostRow::into_post).collect())
    }

    /// Recency listing for the read API. `before` is an exclusive cursor
    /// bound; callers fetch `limit + 1` to detect a further page.
    pub async fn list_recent_posts(
        &self,
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Post>, StorageError> {
        let before = before
            .map(|d| d.timestamp_millis())
            .unwrap_or(i64::MAX);
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts
            WHERE published_at < ?
            ORDER BY published_at DESC
            LIMIT ?
            "#
        ))
        .bind(before)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(PostRow::into_post).collect())
    }

    /// Popularity listing: bookmark count descending, recency as tiebreak.
    /// A NULL count sorts (and encodes in cursors) as 0. The compound cursor
    /// is the (count, published_at) of the last row already returned.
    pub async fn list_popular_posts(
        &self,
        cursor: Option<(i64, DateTime<Utc>)>,
        limit: u32,
    ) -> Result<Vec<Post>, StorageError> {
        let (count, before) = match cursor {
            Some((count, date)) => (count, date.timestamp_millis()),
            None => (i64::MAX, i64::MAX),
        };
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts
            WHERE COALESCE(bookmark_count, 0) < ?
               OR (COALESCE(bookmark_count, 0) = ? AND published_at < ?)
            ORDER BY COALESCE(bookmark_count, 0) DESC, published_at DESC
            LIMIT ?
            "#
        ))
        .bind(count)
        .bind(count)
        .bind(before)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(PostRow::into_post).collect())
    }
}
