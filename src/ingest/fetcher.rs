//! HTTP retrieval of raw feed markup.
//!
//! One attempt per feed per run: a failed or slow source is skipped and
//! retried naturally on the next scheduled ingestion, so there is no retry
//! loop here. Bodies are read through a size-capped stream so a misbehaving
//! server cannot balloon memory.

use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("response exceeds size limit of {0} bytes")]
    ResponseTooLarge(usize),
}

/// Fetches a feed body as text. Non-2xx statuses fail immediately; the
/// whole request (connect through body) runs under one deadline. Bytes are
/// decoded lossily since real feeds occasionally lie about their encoding.
pub async fn fetch_markup(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    max_bytes: usize,
) -> Result<String, FetchError> {
    let bytes = tokio::time::timeout(timeout, async {
        let response = client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, max_bytes).await
    })
    .await
    .map_err(|_| FetchError::Timeout)??;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: reject on Content-Length before reading anything
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
