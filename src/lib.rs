//! planet — a blog feed aggregator.
//!
//! Pulls registered RSS/Atom feeds, deduplicates entries by URL, scores and
//! classifies them, and keeps per-post bookmark counts fresh through a
//! rate-limited external lookup. The binary in `main.rs` wires these pieces
//! to a SQLite database and a CLI.

pub mod bookmark;
pub mod classify;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod pagination;
pub mod storage;
pub mod util;
