// src/ingest/providers/mod.rs
pub mod feed_rss;
pub mod search;

pub use feed_rss::FeedProvider;
pub use search::SearchProvider;
