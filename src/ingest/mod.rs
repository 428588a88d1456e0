//! The ingestion pipeline: HTTP fetch, orchestration, and the optional
//! external scoring oracle.

pub mod fetcher;
pub mod oracle;
pub mod orchestrator;

pub use orchestrator::{reconcile_popularity, run_ingest, IngestStats};
