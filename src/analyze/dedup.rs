// src/analyze/dedup.rs
//! URL deduplication and per-entity grouping.
//!
//! The seen-URL set is global across entities: the first record (in aggregate
//! order) to claim a URL keeps it, even when a later record belongs to a
//! different entity.

use std::collections::{HashMap, HashSet};

use crate::ingest::types::CandidateRecord;

/// Entity buckets in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityBuckets {
    order: Vec<(String, Vec<CandidateRecord>)>,
    index: HashMap<String, usize>,
    duplicates: usize,
}

impl EntityBuckets {
    fn push(&mut self, entity: String, rec: CandidateRecord) {
        let idx = match self.index.get(&entity) {
            Some(&i) => i,
            None => {
                self.order.push((entity.clone(), Vec::new()));
                self.index.insert(entity, self.order.len() - 1);
                self.order.len() - 1
            }
        };
        self.order[idx].1.push(rec);
    }

    pub fn get(&self, entity: &str) -> Option<&[CandidateRecord]> {
        self.index.get(entity).map(|&i| self.order[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CandidateRecord])> {
        self.order.iter().map(|(e, v)| (e.as_str(), v.as_slice()))
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|(e, _)| e.as_str())
    }

    /// Number of entities with at least one record.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total records across all buckets.
    pub fn record_count(&self) -> usize {
        self.order.iter().map(|(_, v)| v.len()).sum()
    }

    /// Records dropped because their URL was already claimed.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Apply `f` to every bucket, keeping entity order.
    pub fn map_buckets<F>(self, mut f: F) -> Self
    where
        F: FnMut(Vec<CandidateRecord>) -> Vec<CandidateRecord>,
    {
        let mut out = EntityBuckets {
            duplicates: self.duplicates,
            ..Default::default()
        };
        for (entity, recs) in self.order {
            for rec in f(recs) {
                out.push(entity.clone(), rec);
            }
        }
        out
    }
}

impl IntoIterator for EntityBuckets {
    type Item = (String, Vec<CandidateRecord>);
    type IntoIter = std::vec::IntoIter<(String, Vec<CandidateRecord>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

/// Drop repeated URLs (first occurrence wins) and bucket the rest by entity.
pub fn group(records: Vec<CandidateRecord>) -> EntityBuckets {
    let mut seen: HashSet<String> = HashSet::new();
    let mut buckets = EntityBuckets::default();

    for rec in records {
        if !seen.insert(rec.url.clone()) {
            buckets.duplicates += 1;
            continue;
        }
        let Some(entity) = rec.entity.clone() else {
            tracing::debug!(url = %rec.url, "record without entity skipped");
            continue;
        };
        buckets.push(entity, rec);
    }

    metrics::counter!("digest_dedup_total").increment(buckets.duplicates as u64);
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::RecordSource;

    fn rec(entity: &str, url: &str, source: RecordSource) -> CandidateRecord {
        CandidateRecord {
            source,
            entity: Some(entity.into()),
            title: format!("{entity} {url}"),
            url: url.into(),
            snippet: String::new(),
            published: None,
            trusted: false,
        }
    }

    #[test]
    fn first_occurrence_wins_across_entities() {
        let records = vec![
            rec("Luke Combs", "https://a.com/1", RecordSource::Feed),
            rec("Zach Bryan", "https://a.com/1", RecordSource::Feed),
            rec("Zach Bryan", "https://a.com/2", RecordSource::Feed),
            rec("Luke Combs", "https://a.com/2", RecordSource::Search),
        ];
        let b = group(records);
        assert_eq!(b.duplicates(), 2);
        assert_eq!(b.record_count(), 2);
        assert_eq!(b.get("Luke Combs").unwrap()[0].url, "https://a.com/1");
        assert_eq!(b.get("Zach Bryan").unwrap()[0].url, "https://a.com/2");
    }

    #[test]
    fn buckets_keep_first_seen_entity_order() {
        let records = vec![
            rec("Hardy", "https://a.com/1", RecordSource::Feed),
            rec("Ernest", "https://a.com/2", RecordSource::Feed),
            rec("Hardy", "https://a.com/3", RecordSource::Search),
        ];
        let b = group(records);
        let names: Vec<_> = b.entities().collect();
        assert_eq!(names, ["Hardy", "Ernest"]);
        assert_eq!(b.get("Hardy").unwrap().len(), 2);
        assert!(b.get("Nobody").is_none());
    }

    #[test]
    fn unattributed_records_are_skipped() {
        let mut r = rec("x", "https://a.com/1", RecordSource::Search);
        r.entity = None;
        let b = group(vec![r]);
        assert!(b.is_empty());
    }

    #[test]
    fn map_buckets_drops_emptied_entities() {
        let b = group(vec![
            rec("Hardy", "https://a.com/1", RecordSource::Feed),
            rec("Ernest", "https://a.com/2", RecordSource::Feed),
        ]);
        let mapped = b.map_buckets(|v| v.into_iter().filter(|r| r.url.ends_with('2')).collect());
        let names: Vec<_> = mapped.entities().collect();
        assert_eq!(names, ["Ernest"]);
    }
}
