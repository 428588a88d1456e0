//! Feed markup handling: HTML entity decoding and tolerant RSS/Atom parsing.
//!
//! Real-world feeds are messy — truncated documents, stray markup, HTML
//! smuggled inside text fields — so [`parser`] extracts what it can and
//! drops what it cannot rather than rejecting whole documents.

pub mod entities;
pub mod parser;
