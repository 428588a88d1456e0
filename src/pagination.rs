//! Opaque cursor codec for the paginated read API.
//!
//! Recency cursors are a bare ISO-8601 timestamp (millisecond precision);
//! popularity cursors are `"<count>:<ISO-8601>"` where `count` is the
//! bookmark count of the last row already returned. Timestamps themselves
//! contain colons, so popularity decoding splits on the first colon only.
//! Only this module constructs or deconstructs cursors.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::storage::Post;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("popularity cursor missing ':' separator")]
    MissingSeparator,

    #[error("invalid count in cursor: {0:?}")]
    InvalidCount(String),

    #[error("invalid timestamp in cursor: {0:?}")]
    InvalidTimestamp(String),
}

/// Listing order the cursor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Recent,
    Popular,
}

/// One page of the read API. `next_cursor` is present exactly when
/// `has_more` is true.
#[derive(Debug, Serialize)]
pub struct Page {
    pub data: Vec<Post>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

fn iso_millis(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, CursorError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| CursorError::InvalidTimestamp(s.to_string()))
}

pub fn encode_recency_cursor(date: DateTime<Utc>) -> String {
    iso_millis(date)
}

pub fn decode_recency_cursor(cursor: &str) -> Result<DateTime<Utc>, CursorError> {
    parse_timestamp(cursor)
}

pub fn encode_popularity_cursor(count: i64, date: DateTime<Utc>) -> String {
    format!("{}:{}", count, iso_millis(date))
}

/// Splits on the first colon only; the timestamp's own colons pass through.
pub fn decode_popularity_cursor(cursor: &str) -> Result<(i64, DateTime<Utc>), CursorError> {
    let (count, date) = cursor.split_once(':').ok_or(CursorError::MissingSeparator)?;
    let count = count
        .parse::<i64>()
        .map_err(|_| CursorError::InvalidCount(count.to_string()))?;
    Ok((count, parse_timestamp(date)?))
}

/// Builds a page from a `limit + 1` over-fetch. More than `limit` rows means
/// a further page exists; the extra row is dropped and the cursor points at
/// the last row actually returned. A NULL bookmark count encodes as 0.
pub fn build_page(mut rows: Vec<Post>, limit: usize, order: SortOrder) -> Page {
    let has_more = rows.len() > limit;
    if has_more {
        rows.truncate(limit);
    }

    let next_cursor = if has_more {
        rows.last().map(|last| match order {
            SortOrder::Recent => encode_recency_cursor(last.published_at),
            SortOrder::Popular => {
                encode_popularity_cursor(last.bookmark_count.unwrap_or(0), last.published_at)
            }
        })
    } else {
        None
    };

    Page {
        data: rows,
        has_more,
        next_cursor,
    }
}
