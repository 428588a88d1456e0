//! Adapter for the external bookmark-count API.
//!
//! The upstream endpoint is unauthenticated, has no batch form, and
//! documents no concurrency tolerance, so lookups are issued strictly
//! sequentially with a fixed inter-request delay. A failed lookup is
//! semantically "unknown popularity" and resolves to 0 — callers never see
//! an error from this module.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
enum CountError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("non-numeric response body")]
    InvalidBody,
}

/// Fixed-delay sequencer: the first call passes immediately, every later
/// call sleeps the configured delay. Kept separate from the HTTP client so
/// the pacing policy is testable under paused tokio time.
pub struct Pacer {
    delay: Duration,
    primed: bool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            primed: false,
        }
    }

    pub async fn pace(&mut self) {
        if self.primed {
            tokio::time::sleep(self.delay).await;
        } else {
            self.primed = true;
        }
    }
}

#[derive(Clone)]
pub struct BookmarkClient {
    http: reqwest::Client,
    endpoint: String,
    delay: Duration,
}

impl BookmarkClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, delay: Duration) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            delay,
        }
    }

    /// Fetches the bookmark count for one URL. Never fails: transport
    /// errors, non-2xx statuses, and non-numeric bodies all resolve to 0,
    /// indistinguishable from a genuine zero.
    pub async fn fetch_count(&self, url: &str) -> u64 {
        match self.try_fetch(url).await {
            Ok(count) => count,
            Err(e) => {
                tracing::debug!(url, error = %e, "Bookmark count lookup failed, treating as 0");
                0
            }
        }
    }

    /// Sequential counts for a batch of URLs, pacing between requests.
    /// The returned map is complete even when individual lookups failed
    /// (those entries are 0). Empty input makes zero network calls.
    pub async fn fetch_counts(&self, urls: &[String]) -> HashMap<String, u64> {
        let mut counts = HashMap::with_capacity(urls.len());
        let mut pacer = Pacer::new(self.delay);
        for url in urls {
            pacer.pace().await;
            counts.insert(url.clone(), self.fetch_count(url).await);
        }
        counts
    }

    async fn try_fetch(&self, url: &str) -> Result<u64, CountError> {
        let response = tokio::time::timeout(
            REQUEST_TIMEOUT,
            self.http.get(&self.endpoint).query(&[("url", url)]).send(),
        )
        .await
        .map_err(|_| CountError::Timeout)?
        .map_err(CountError::Network)?;

        if !response.status().is_success() {
            return Err(CountError::HttpStatus(response.status().as_u16()));
        }

        let body = response.text().await.map_err(CountError::Network)?;
        // Bare JSON integer; the API answers `null` for URLs it has never seen
        match serde_json::from_str::<Option<i64>>(body.trim()) {
            Ok(Some(n)) => Ok(n.max(0) as u64),
            Ok(None) => Ok(0),
            Err(_) => Err(CountError::InvalidBody),
        }
    }
}
