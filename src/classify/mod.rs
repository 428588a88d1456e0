//! Deterministic content classification: keyword relevance scoring and
//! two-level topic assignment. No network, no model calls — the same input
//! always produces the same score and topics.

pub mod relevance;
pub mod topics;
