// src/analyze/mod.rs
//! Digest pipeline: dedup + group → rank → compose (optionally enriched).

pub mod ai_adapter;
pub mod compose;
pub mod dedup;
pub mod rerank;

use tracing::info;

pub use crate::analyze::ai_adapter::{build_enricher, AlertEnricher, DynEnricher};
pub use crate::analyze::compose::{build_rule_alerts, compose, Alert, AlertSource};
pub use crate::analyze::dedup::{group, EntityBuckets};
pub use crate::analyze::rerank::{rank, MAX_SOURCES_PER_ALERT};

use crate::ingest::types::CandidateRecord;

/// Alerts plus how they were produced.
#[derive(Debug, Clone, Default)]
pub struct ComposeReport {
    pub alerts: Vec<Alert>,
    /// Entities whose alert came from the enricher.
    pub enriched: usize,
    /// Entities composed by the rule-based fallback.
    pub rule_based: usize,
}

/// Dedup, group and rank aggregated records.
pub fn group_and_rank(records: Vec<CandidateRecord>) -> EntityBuckets {
    group(records).map_buckets(rank)
}

/// Compose one alert per ranked bucket.
///
/// The enricher's alert is used for an entity when it returned a valid one;
/// every other entity gets the rule-based alert. Enricher failure never
/// propagates.
pub async fn compose_alerts(
    enricher: &dyn AlertEnricher,
    ranked: &EntityBuckets,
) -> ComposeReport {
    if ranked.is_empty() {
        return ComposeReport::default();
    }

    let enriched = enricher.produce_alerts(ranked).await.unwrap_or_default();
    if enriched.is_empty() && enricher.provider_name() != "disabled" {
        info!(
            provider = enricher.provider_name(),
            "enricher returned no structured alerts; used fallback"
        );
    }

    let mut report = ComposeReport::default();
    for (entity, recs) in ranked.iter() {
        if let Some(a) = enriched.iter().find(|a| a.entity == entity) {
            report.alerts.push(a.clone());
            report.enriched += 1;
        } else if let Some(a) = compose(entity, recs) {
            report.alerts.push(a);
            report.rule_based += 1;
        }
    }
    report
}
