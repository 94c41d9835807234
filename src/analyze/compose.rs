// src/analyze/compose.rs
//! Rule-based alert composition.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analyze::dedup::EntityBuckets;
use crate::analyze::rerank::MAX_SOURCES_PER_ALERT;
use crate::ingest::normalize_text;
use crate::ingest::types::CandidateRecord;

pub const DEFAULT_SUMMARY: &str = "A concise roundup of credible mentions in the last 24 hours.";
pub const DEFAULT_LABELS: &[&str] = &["Alert", "Country Music", "News"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSource {
    pub label: String,
    pub url: String,
}

/// One digest per entity. Built once, sent once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub entity: String,
    pub summary: String,
    pub sources: Vec<AlertSource>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Alert {
    /// Short stable id for logs (entity + source urls).
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.entity.as_bytes());
        for s in &self.sources {
            hasher.update(b"\n");
            hasher.update(s.url.as_bytes());
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

pub fn default_headline(entity: &str) -> String {
    format!("{entity} — Recent Mentions")
}

/// Compose with the default headline. `None` when there is nothing to report.
pub fn compose(entity: &str, ranked: &[CandidateRecord]) -> Option<Alert> {
    compose_with_headline(entity, ranked, None)
}

pub fn compose_with_headline(
    entity: &str,
    ranked: &[CandidateRecord],
    headline: Option<&str>,
) -> Option<Alert> {
    if ranked.is_empty() {
        return None;
    }

    let title = headline
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_headline(entity));

    let sources = ranked
        .iter()
        .take(MAX_SOURCES_PER_ALERT)
        .map(|r| AlertSource {
            label: source_label(&r.title),
            url: r.url.clone(),
        })
        .collect();

    Some(Alert {
        title,
        entity: entity.to_string(),
        summary: DEFAULT_SUMMARY.to_string(),
        sources,
        labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Plain-text label for a source link; "Source" when the title is blank.
pub fn source_label(title: &str) -> String {
    let label = normalize_text(title);
    if label.is_empty() {
        "Source".to_string()
    } else {
        label
    }
}

/// One alert per non-empty (already ranked) bucket, in bucket order.
pub fn build_rule_alerts(ranked: &EntityBuckets) -> Vec<Alert> {
    ranked
        .iter()
        .filter_map(|(entity, recs)| compose(entity, recs))
        .collect()
}
