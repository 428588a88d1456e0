//! Sequential ingestion run: fetch each registered feed, parse it, and
//! store the entries that are new by URL.
//!
//! The run is deliberately single-lane. Sources are visited in storage
//! order, one at a time; a failing source is logged and skipped so the rest
//! of the run proceeds. Overlapping runs are tolerated because the URL
//! uniqueness constraint turns a racing duplicate insert into a per-item
//! skip, never a double-store.

use chrono::{DateTime, NaiveDate, Utc};

use crate::bookmark::BookmarkClient;
use crate::classify::{relevance, topics};
use crate::config::Config;
use crate::feed::parser;
use crate::ingest::fetcher;
use crate::ingest::oracle::ScoreOracle;
use crate::storage::{Database, NewPost};
use crate::util::text::truncate_chars;

/// Longest stored summary / source description, in characters.
const SUMMARY_MAX_CHARS: usize = 500;

/// Per-run counters, logged at the end of every ingestion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub posts_inserted: usize,
    pub posts_skipped: usize,
}

/// Runs one full ingestion pass over every registered source, then refreshes
/// popularity counts for the posts that are due.
pub async fn run_ingest(
    db: &Database,
    http: &reqwest::Client,
    bookmarks: &BookmarkClient,
    oracle: Option<&ScoreOracle>,
    config: &Config,
) -> anyhow::Result<IngestStats> {
    let sources = db.list_sources().await?;
    let timeout = std::time::Duration::from_secs(config.fetch_timeout_secs);
    let mut stats = IngestStats::default();

    for source in &sources {
        let markup =
            match fetcher::fetch_markup(http, &source.url, timeout, config.max_feed_bytes).await {
                Ok(markup) => markup,
                Err(e) => {
                    tracing::warn!(url = %source.url, error = %e, "Feed fetch failed, skipping source");
                    stats.sources_failed += 1;
                    continue;
                }
            };

        let feed = match parser::parse_feed(&markup) {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(url = %source.url, error = %e, "Feed parse failed, skipping source");
                stats.sources_failed += 1;
                continue;
            }
        };

        // Description backfill: only fills a hole, never overwrites
        if source.description.is_none() {
            if let Some(desc) = feed.description.as_deref() {
                let desc = truncate_chars(desc, SUMMARY_MAX_CHARS);
                if !desc.is_empty() {
                    if let Err(e) = db.update_source_description(source.id, desc).await {
                        tracing::warn!(url = %source.url, error = %e, "Description backfill failed, continuing");
                    }
                }
            }
        }

        for item in &feed.items {
            match db.find_post_by_url(&item.link).await {
                Ok(Some(_)) => {
                    stats.posts_skipped += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(url = %item.link, error = %e, "Dedup lookup failed, skipping item");
                    stats.posts_skipped += 1;
                    continue;
                }
            }

            let summary = item.description.as_deref();
            let score = resolve_score(oracle, &item.title, summary).await;
            let pair = topics::classify(&item.title, summary);

            let post = NewPost {
                source_id: source.id,
                title: item.title.clone(),
                summary: summary.map(|s| truncate_chars(s, SUMMARY_MAX_CHARS).to_string()),
                url: item.link.clone(),
                thumbnail: item.thumbnail.clone(),
                published_at: resolve_published(item.published_raw.as_deref()),
                score: Some(score),
                topic_main: pair.main,
                topic_sub: pair.sub,
            };

            match db.insert_post(&post).await {
                Ok(_) => stats.posts_inserted += 1,
                Err(e) => {
                    // Usually a concurrent run won the URL uniqueness race
                    tracing::warn!(url = %item.link, error = %e, "Post insert failed, continuing");
                    stats.posts_skipped += 1;
                }
            }
        }

        stats.sources_ok += 1;
        tracing::debug!(url = %source.url, items = feed.items.len(), "Source ingested");
    }

    let refreshed = reconcile_popularity(db, bookmarks, config).await?;

    tracing::info!(
        sources_ok = stats.sources_ok,
        sources_failed = stats.sources_failed,
        posts_inserted = stats.posts_inserted,
        posts_skipped = stats.posts_skipped,
        counts_refreshed = refreshed,
        "Ingestion run complete"
    );
    Ok(stats)
}

/// Refreshes bookmark counts for posts that were never counted or were
/// published inside the recency window. Writes only on change; a lookup
/// failure surfaces as count 0, which still settles NULL counts.
pub async fn reconcile_popularity(
    db: &Database,
    bookmarks: &BookmarkClient,
    config: &Config,
) -> anyhow::Result<usize> {
    let due = db
        .list_posts_for_reconciliation(
            chrono::Duration::days(config.reconcile_window_days),
            config.reconcile_batch_size,
        )
        .await?;

    let urls: Vec<String> = due.iter().map(|p| p.url.clone()).collect();
    let counts = bookmarks.fetch_counts(&urls).await;

    let mut updated = 0;
    for post in &due {
        let count = counts.get(&post.url).copied().unwrap_or(0) as i64;
        if post.bookmark_count == Some(count) {
            continue;
        }
        if let Err(e) = db.update_post_bookmark_count(post.id, count).await {
            tracing::warn!(url = %post.url, error = %e, "Count update failed, continuing");
            continue;
        }
        updated += 1;
    }

    tracing::debug!(due = due.len(), updated, "Popularity reconciliation complete");
    Ok(updated)
}

async fn resolve_score(oracle: Option<&ScoreOracle>, title: &str, summary: Option<&str>) -> f64 {
    if let Some(oracle) = oracle {
        match oracle.score(title, summary).await {
            Ok(score) => return score,
            Err(e) => {
                tracing::warn!(error = %e, "Scoring oracle failed, using keyword scorer");
            }
        }
    }
    relevance::score(title, summary)
}

/// Resolves a verbatim feed date string to UTC. RFC-2822 (RSS) is tried
/// first, then RFC-3339/ISO-8601 (Atom), then a bare `YYYY-MM-DD` taken as
/// midnight UTC. Anything else resolves to the ingestion instant, which
/// keeps the post visible at the top of the recency listing rather than
/// buried at epoch.
fn resolve_published(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw else {
        return Utc::now();
    };
    let raw = raw.trim();

    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return date.with_timezone(&Utc);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return date.with_timezone(&Utc);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return midnight.and_utc();
        }
    }

    tracing::debug!(raw, "Unparseable publish date, using current time");
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::storage::SourceKind;

    const FEED_WITH_DESCRIPTION: &str = r#"<rss version="2.0"><channel>
      <title>Gamma Blog</title>
      <description>Channel-level blurb</description>
      <item>
        <title>Only post</title>
        <link>https://gamma.example/p1</link>
      </item>
    </channel></rss>"#;

    #[tokio::test]
    async fn test_backfill_write_failure_does_not_abort_run() {
        let feeds = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED_WITH_DESCRIPTION))
            .mount(&feeds)
            .await;
        let counts = MockServer::start().await;

        let db = Database::open(":memory:").await.unwrap();
        db.upsert_source(
            &format!("{}/feed", feeds.uri()),
            "Gamma",
            None,
            SourceKind::Blog,
            false,
        )
        .await
        .unwrap();
        // Reject every later write to sources, so the backfill fails
        sqlx::query(
            "CREATE TRIGGER freeze_sources BEFORE UPDATE ON sources \
             BEGIN SELECT RAISE(ABORT, 'sources are frozen'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let config = Config {
            bookmark_api_endpoint: counts.uri(),
            bookmark_delay_ms: 0,
            ..Config::default()
        };
        let http = reqwest::Client::new();
        let bookmarks = BookmarkClient::new(http.clone(), counts.uri(), Duration::ZERO);

        let stats = run_ingest(&db, &http, &bookmarks, None, &config)
            .await
            .expect("a failed backfill must not abort the run");
        assert_eq!(stats.sources_ok, 1);
        assert_eq!(stats.posts_inserted, 1);
        assert_eq!(db.list_sources().await.unwrap()[0].description, None);
    }

    #[tokio::test]
    async fn test_count_update_failure_does_not_abort_reconciliation() {
        let counts = MockServer::start().await;
        let db = Database::open(":memory:").await.unwrap();
        let sid = db
            .upsert_source("https://gamma.example/feed", "Gamma", None, SourceKind::Blog, false)
            .await
            .unwrap();
        for n in 1..=2 {
            db.insert_post(&NewPost {
                source_id: sid,
                title: format!("P{n}"),
                summary: None,
                url: format!("https://gamma.example/p{n}"),
                thumbnail: None,
                published_at: Utc::now(),
                score: None,
                topic_main: None,
                topic_sub: None,
            })
            .await
            .unwrap();
        }
        sqlx::query(
            "CREATE TRIGGER freeze_posts BEFORE UPDATE ON posts \
             BEGIN SELECT RAISE(ABORT, 'posts are frozen'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let config = Config {
            bookmark_api_endpoint: counts.uri(),
            bookmark_delay_ms: 0,
            ..Config::default()
        };
        let bookmarks = BookmarkClient::new(reqwest::Client::new(), counts.uri(), Duration::ZERO);

        // Both posts are due (NULL counts) and both writes fail; the pass
        // still visits every post and reports zero updates instead of erroring
        let updated = reconcile_popularity(&db, &bookmarks, &config)
            .await
            .expect("a failed count write must not abort reconciliation");
        assert_eq!(updated, 0);
    }

    #[test]
    fn test_resolve_published_rfc2822() {
        let date = resolve_published(Some("Tue, 05 Aug 2025 10:30:00 +0000"));
        assert_eq!(date, Utc.with_ymd_and_hms(2025, 8, 5, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_resolve_published_rfc2822_offset_converted_to_utc() {
        let date = resolve_published(Some("Tue, 05 Aug 2025 19:30:00 +0900"));
        assert_eq!(date, Utc.with_ymd_and_hms(2025, 8, 5, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_resolve_published_rfc3339() {
        let date = resolve_published(Some("2025-08-05T10:30:00Z"));
        assert_eq!(date, Utc.with_ymd_and_hms(2025, 8, 5, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_resolve_published_bare_date_is_midnight_utc() {
        let date = resolve_published(Some("2025-08-05"));
        assert_eq!(date, Utc.with_ymd_and_hms(2025, 8, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_published_garbage_falls_back_to_now() {
        let before = Utc::now();
        let date = resolve_published(Some("next tuesday-ish"));
        assert!(date >= before && date <= Utc::now());
    }

    #[test]
    fn test_resolve_published_missing_falls_back_to_now() {
        let before = Utc::now();
        let date = resolve_published(None);
        assert!(date >= before && date <= Utc::now());
    }
}
