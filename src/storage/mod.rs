mod posts;
mod schema;
mod sources;
mod types;

pub use schema::Database;
pub use types::{FeedSource, NewPost, Post, SourceKind, StorageError};
