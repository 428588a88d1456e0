use chrono::Utc;

use super::schema::Database;
use super::types::{FeedSource, SourceKind, SourceRow, StorageError};

const SOURCE_COLUMNS: &str = "id, url, title, description, site_url, kind, official, \
                              bookmark_total, user_id, created_at, updated_at";

impl Database {
    /// Register a source, or refresh its title/site URL when the (unique,
    /// pre-normalized) feed URL already exists. Returns the source id.
    pub async fn upsert_source(
        &self,
        url: &str,
        title: &str,
        site_url: Option<&str>,
        kind: SourceKind,
        official: bool,
    ) -> Result<i64, StorageError> {
        let now = Utc::now().timestamp_millis();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sources (url, title, site_url, kind, official, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                site_url = excluded.site_url,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(url)
        .bind(title)
        .bind(site_url)
        .bind(kind.as_str())
        .bind(official)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool())
        .await?;

        Ok(id)
    }

    /// All registered sources in stable storage order. Ingestion iterates
    /// this order deterministically.
    pub async fn list_sources(&self) -> Result<Vec<FeedSource>, StorageError> {
        let rows: Vec<SourceRow> =
            sqlx::query_as(&format!("SELECT {SOURCE_COLUMNS} FROM sources ORDER BY id"))
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().map(SourceRow::into_source).collect())
    }

    /// Backfill a source description discovered during ingestion.
    pub async fn update_source_description(
        &self,
        source_id: i64,
        description: &str,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE sources SET description = ?, updated_at = ? WHERE id = ?")
            .bind(description)
            .bind(Utc::now().timestamp_millis())
            .bind(source_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Record a bookmark relationship row. The aggregate `bookmark_total` is
    /// maintained by the API layer's toggle endpoints; this only stores the
    /// truth that [`reconcile_source_totals`](Self::reconcile_source_totals)
    /// reads.
    pub async fn insert_bookmark(&self, source_id: i64, user_id: i64) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT OR IGNORE INTO bookmarks (source_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(source_id)
        .bind(user_id)
        .bind(Utc::now().timestamp_millis())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Recompute each source's aggregate bookmark count from the true count
    /// of bookmark rows, writing only where the stored value drifted.
    /// Returns the number of corrected sources.
    pub async fn reconcile_source_totals(&self) -> Result<usize, StorageError> {
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT s.id, s.bookmark_total, COUNT(b.id)
            FROM sources s
            LEFT JOIN bookmarks b ON b.source_id = s.id
            GROUP BY s.id
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        let mut corrected = 0;
        for (source_id, stored, actual) in rows {
            if stored == actual {
                continue;
            }
            sqlx::query("UPDATE sources SET bookmark_total = ?, updated_at = ? WHERE id = ?")
                .bind(actual)
                .bind(Utc::now().timestamp_millis())
                .bind(source_id)
                .execute(self.pool())
                .await?;
            tracing::info!(source_id, stored, actual, "Corrected drifted bookmark total");
            corrected += 1;
        }
        Ok(corrected)
    }
}
