//! Optional remote relevance scorer.
//!
//! When a scoring service is configured, ingestion asks it first and only
//! falls back to the built-in keyword scorer on error. The service takes the
//! title and summary and answers a bare JSON float in `[0, 1]`.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("non-numeric response body")]
    InvalidBody,
    #[error("score {0} outside [0, 1]")]
    OutOfRange(f64),
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    title: &'a str,
    summary: Option<&'a str>,
}

#[derive(Clone)]
pub struct ScoreOracle {
    http: reqwest::Client,
    endpoint: String,
}

impl ScoreOracle {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub async fn score(&self, title: &str, summary: Option<&str>) -> Result<f64, OracleError> {
        let response = tokio::time::timeout(
            REQUEST_TIMEOUT,
            self.http
                .post(&self.endpoint)
                .json(&ScoreRequest { title, summary })
                .send(),
        )
        .await
        .map_err(|_| OracleError::Timeout)?
        .map_err(OracleError::Network)?;

        if !response.status().is_success() {
            return Err(OracleError::HttpStatus(response.status().as_u16()));
        }

        let body = response.text().await.map_err(OracleError::Network)?;
        let score: f64 = body.trim().parse().map_err(|_| OracleError::InvalidBody)?;
        if !(0.0..=1.0).contains(&score) || score.is_nan() {
            return Err(OracleError::OutOfRange(score));
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json_string, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_score_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json_string(
                r#"{"title":"Rust tips","summary":null}"#,
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string("0.85"))
            .mount(&server)
            .await;

        let oracle = ScoreOracle::new(reqwest::Client::new(), server.uri());
        let score = oracle.score("Rust tips", None).await.unwrap();
        assert!((score - 0.85).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_score_out_of_range_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1.5"))
            .mount(&server)
            .await;

        let oracle = ScoreOracle::new(reqwest::Client::new(), server.uri());
        let err = oracle.score("t", None).await.unwrap_err();
        assert!(matches!(err, OracleError::OutOfRange(_)));
    }

    #[tokio::test]
    async fn test_score_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let oracle = ScoreOracle::new(reqwest::Client::new(), server.uri());
        let err = oracle.score("t", None).await.unwrap_err();
        assert!(matches!(err, OracleError::HttpStatus(500)));
    }
}
