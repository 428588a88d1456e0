use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use super::types::StorageError;

/// SQLite-backed persistence facade. Cloning shares the pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        let statements = [
            "PRAGMA foreign_keys = ON",
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY,
                url TEXT UNIQUE NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                site_url TEXT,
                kind TEXT NOT NULL DEFAULT 'blog',
                official INTEGER NOT NULL DEFAULT 0,
                bookmark_total INTEGER NOT NULL DEFAULT 0,
                user_id INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            // posts.url UNIQUE is the dedup invariant: overlapping runs rely on
            // this constraint, not on transactions, to prevent double inserts
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                summary TEXT,
                url TEXT UNIQUE NOT NULL,
                thumbnail TEXT,
                published_at INTEGER NOT NULL,
                score REAL,
                topic_main TEXT,
                topic_sub TEXT,
                bookmark_count INTEGER,
                created_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS bookmarks (
                id INTEGER PRIMARY KEY,
                source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE(source_id, user_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_posts_source ON posts(source_id)",
            "CREATE INDEX IF NOT EXISTS idx_posts_published ON posts(published_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_posts_popularity ON posts(bookmark_count DESC, published_at DESC)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Migration(e.to_string()))?;
        }
        Ok(())
    }
}
