// src/analyze/rerank.rs
//! Ranking inside one entity bucket.
//!
//! Trusted hosts first; inside a trust tier, records without a publish time
//! come first, then the rest oldest to newest. The sort is stable, so ties keep
//! aggregate order (feed before search).

use crate::ingest::types::CandidateRecord;

/// Upper bound on sources per alert.
pub const MAX_SOURCES_PER_ALERT: usize = 5;

pub fn rank(records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    rank_top(records, MAX_SOURCES_PER_ALERT)
}

pub fn rank_top(mut records: Vec<CandidateRecord>, n: usize) -> Vec<CandidateRecord> {
    // None sorts before Some: undated records lead their tier.
    records.sort_by_key(|r| (!r.trusted, r.published));
    records.truncate(n);
    records
}
