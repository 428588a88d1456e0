//! End-to-end ingestion tests: mocked feed servers and bookmark API, real
//! in-memory SQLite.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use planet::bookmark::BookmarkClient;
use planet::classify::topics::Topic;
use planet::config::Config;
use planet::ingest::{self, oracle::ScoreOracle};
use planet::storage::{Database, SourceKind};

const RSS_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Alpha Blog</title>
    <description>Notes on systems programming</description>
    <link>https://alpha.example/</link>
    <item>
      <title>Fearless concurrency in Rust</title>
      <link>https://alpha.example/rust-concurrency</link>
      <description><![CDATA[Threads, channels, and the <b>borrow checker.</b>]]></description>
      <pubDate>Tue, 05 Aug 2025 10:30:00 +0000</pubDate>
    </item>
    <item>
      <title>Shared weekend reading</title>
      <link>https://x.example/p1</link>
      <pubDate>Mon, 04 Aug 2025 08:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

const ATOM_FEED: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Beta Weekly</title>
  <entry>
    <title>Kubernetes networking deep dive</title>
    <link rel="alternate" href="https://beta.example/k8s-networking"/>
    <summary>Service meshes and the terraform of it all.</summary>
    <published>2025-08-03T12:00:00Z</published>
  </entry>
  <entry>
    <title>Shared weekend reading</title>
    <link rel="alternate" href="https://x.example/p1"/>
    <published>2025-08-04T08:00:00Z</published>
  </entry>
</feed>"#;

struct Harness {
    db: Database,
    http: reqwest::Client,
    feeds: MockServer,
    counts: MockServer,
    config: Config,
}

impl Harness {
    async fn new() -> Self {
        let feeds = MockServer::start().await;
        let counts = MockServer::start().await;
        let config = Config {
            bookmark_api_endpoint: counts.uri(),
            bookmark_delay_ms: 0,
            ..Config::default()
        };
        Self {
            db: Database::open(":memory:").await.unwrap(),
            http: reqwest::Client::new(),
            feeds,
            counts,
            config,
        }
    }

    fn bookmarks(&self) -> BookmarkClient {
        BookmarkClient::new(
            self.http.clone(),
            self.config.bookmark_api_endpoint.clone(),
            Duration::from_millis(self.config.bookmark_delay_ms),
        )
    }

    async fn mount_feed(&self, route: &str, body: &str) -> i64 {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.feeds)
            .await;
        self.db
            .upsert_source(
                &format!("{}{}", self.feeds.uri(), route),
                route.trim_start_matches('/'),
                None,
                SourceKind::Blog,
                false,
            )
            .await
            .unwrap()
    }

    async fn run(&self) -> ingest::IngestStats {
        ingest::run_ingest(&self.db, &self.http, &self.bookmarks(), None, &self.config)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_ingest_stores_scored_and_classified_posts() {
    let h = Harness::new().await;
    h.mount_feed("/alpha", RSS_FEED).await;

    let stats = h.run().await;
    assert_eq!(stats.sources_ok, 1);
    assert_eq!(stats.posts_inserted, 2);

    let post = h
        .db
        .find_post_by_url("https://alpha.example/rust-concurrency")
        .await
        .unwrap()
        .expect("post should be stored");
    assert_eq!(post.title, "Fearless concurrency in Rust");
    // CDATA description survives with HTML stripped
    assert_eq!(
        post.summary.as_deref(),
        Some("Threads, channels, and the borrow checker.")
    );
    assert_eq!(
        post.published_at,
        Utc.with_ymd_and_hms(2025, 8, 5, 10, 30, 0).unwrap()
    );
    // "rust" and "concurrency" are both high-tier keywords
    assert_eq!(post.score, Some(0.60));
    assert_eq!(post.topic_main, Some(Topic::Languages));
    assert_eq!(post.topic_sub, None);
}

#[tokio::test]
async fn test_same_url_across_feeds_stored_once() {
    let h = Harness::new().await;
    h.mount_feed("/alpha", RSS_FEED).await;
    h.mount_feed("/beta", ATOM_FEED).await;

    let stats = h.run().await;
    assert_eq!(stats.sources_ok, 2);
    // 4 items total, one link shared between the feeds
    assert_eq!(stats.posts_inserted, 3);
    assert_eq!(stats.posts_skipped, 1);

    let recent = h.db.list_recent_posts(None, 10).await.unwrap();
    let shared: Vec<_> = recent
        .iter()
        .filter(|p| p.url == "https://x.example/p1")
        .collect();
    assert_eq!(shared.len(), 1);
}

#[tokio::test]
async fn test_second_run_skips_everything() {
    let h = Harness::new().await;
    h.mount_feed("/alpha", RSS_FEED).await;

    h.run().await;
    let stats = h.run().await;
    assert_eq!(stats.posts_inserted, 0);
    assert_eq!(stats.posts_skipped, 2);
}

#[tokio::test]
async fn test_failed_source_does_not_abort_run() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.feeds)
        .await;
    h.db.upsert_source(
        &format!("{}/broken", h.feeds.uri()),
        "broken",
        None,
        SourceKind::Blog,
        false,
    )
    .await
    .unwrap();
    h.mount_feed("/beta", ATOM_FEED).await;

    let stats = h.run().await;
    assert_eq!(stats.sources_failed, 1);
    assert_eq!(stats.sources_ok, 1);
    assert_eq!(stats.posts_inserted, 2);
}

#[tokio::test]
async fn test_unparseable_markup_counts_as_failed_source() {
    let h = Harness::new().await;
    h.mount_feed("/junk", "<html><body>not a feed</body></html>")
        .await;

    let stats = h.run().await;
    assert_eq!(stats.sources_failed, 1);
    assert_eq!(stats.sources_ok, 0);
}

#[tokio::test]
async fn test_description_backfill_fills_only_holes() {
    let h = Harness::new().await;
    let id = h.mount_feed("/alpha", RSS_FEED).await;

    h.run().await;
    let sources = h.db.list_sources().await.unwrap();
    assert_eq!(
        sources[0].description.as_deref(),
        Some("Notes on systems programming")
    );

    // A manually curated description is never overwritten
    h.db.update_source_description(id, "curated by hand")
        .await
        .unwrap();
    h.run().await;
    let sources = h.db.list_sources().await.unwrap();
    assert_eq!(sources[0].description.as_deref(), Some("curated by hand"));
}

#[tokio::test]
async fn test_reconciliation_fetches_and_stores_counts() {
    let h = Harness::new().await;
    h.mount_feed("/alpha", RSS_FEED).await;
    Mock::given(method("GET"))
        .and(query_param("url", "https://alpha.example/rust-concurrency"))
        .respond_with(ResponseTemplate::new(200).set_body_string("17"))
        .mount(&h.counts)
        .await;
    // The other post's URL has no mock: the lookup fails and settles as 0

    h.run().await;

    let counted = h
        .db
        .find_post_by_url("https://alpha.example/rust-concurrency")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counted.bookmark_count, Some(17));

    let uncounted = h
        .db
        .find_post_by_url("https://x.example/p1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(uncounted.bookmark_count, Some(0));
}

#[tokio::test]
async fn test_oracle_score_preferred_over_keyword_scorer() {
    let h = Harness::new().await;
    h.mount_feed("/alpha", RSS_FEED).await;

    let oracle_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("0.99"))
        .mount(&oracle_server)
        .await;
    let oracle = ScoreOracle::new(h.http.clone(), oracle_server.uri());

    ingest::run_ingest(&h.db, &h.http, &h.bookmarks(), Some(&oracle), &h.config)
        .await
        .unwrap();

    let post = h
        .db
        .find_post_by_url("https://alpha.example/rust-concurrency")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.score, Some(0.99));
}

#[tokio::test]
async fn test_oracle_failure_falls_back_to_keyword_scorer() {
    let h = Harness::new().await;
    h.mount_feed("/alpha", RSS_FEED).await;

    let oracle_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&oracle_server)
        .await;
    let oracle = ScoreOracle::new(h.http.clone(), oracle_server.uri());

    ingest::run_ingest(&h.db, &h.http, &h.bookmarks(), Some(&oracle), &h.config)
        .await
        .unwrap();

    let post = h
        .db
        .find_post_by_url("https://alpha.example/rust-concurrency")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.score, Some(0.60));
}
