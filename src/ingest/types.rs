// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Where a record came from.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Feed,
    Search,
}

impl RecordSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordSource::Feed => "rss",
            RecordSource::Search => "cse",
        }
    }
}

/// One normalized mention of a tracked entity.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CandidateRecord {
    pub source: RecordSource,
    pub entity: Option<String>, // always set once a record leaves a provider
    pub title: String,          // plain text
    pub url: String,            // dedup key
    pub snippet: String,        // plain text, may be empty
    pub published: Option<DateTime<Utc>>,
    pub trusted: bool,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Fetch records mentioning any of `entities`.
    async fn fetch_latest(&self, entities: &[String]) -> Result<Vec<CandidateRecord>>;
    fn name(&self) -> &'static str;
}
