mod client;

pub use client::{BookmarkClient, Pacer};
