//! AI enrichment: provider abstraction + payload validation.
//!
//! An enricher gets the ranked evidence for every entity and may return richer
//! alerts. Whatever it returns is validated here; anything unusable is dropped
//! and the caller falls back to rule-based composition for that entity.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analyze::compose::{source_label, Alert, AlertSource, DEFAULT_LABELS, DEFAULT_SUMMARY};
use crate::analyze::dedup::EntityBuckets;
use crate::analyze::rerank::MAX_SOURCES_PER_ALERT;
use crate::config::ai::AiConfig;
use crate::ingest::normalize_text;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Strategy that may turn evidence into alerts. `None` means "unavailable".
pub trait AlertEnricher: Send + Sync {
    fn produce_alerts<'a>(
        &'a self,
        evidence: &'a EntityBuckets,
    ) -> Pin<Box<dyn Future<Output = Option<Vec<Alert>>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynEnricher = Arc<dyn AlertEnricher>;

/// Factory: build an enricher according to config.
///
/// * `test_mode` → deterministic mock.
/// * no API key → disabled.
/// * otherwise Gemini.
pub fn build_enricher(cfg: &AiConfig) -> DynEnricher {
    if cfg.test_mode {
        return Arc::new(MockEnricher);
    }
    match &cfg.api_key {
        Some(key) => match GeminiEnricher::new(key.clone(), cfg) {
            Ok(g) => Arc::new(g),
            Err(e) => {
                tracing::warn!(error = ?e, "Gemini unavailable; falling back to rules");
                Arc::new(DisabledEnricher)
            }
        },
        None => Arc::new(DisabledEnricher),
    }
}

// ------------------------------------------------------------
// Payload shapes + validation
// ------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSource {
    #[serde(default, alias = "title")]
    pub label: String,
    #[serde(default, alias = "link")]
    pub url: String,
}

/// Alert as a model might emit it; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAlert {
    #[serde(default, alias = "headline")]
    pub title: String,
    #[serde(default, alias = "artist")]
    pub entity: String,
    #[serde(default, alias = "dek")]
    pub summary: String,
    #[serde(default, alias = "links")]
    pub sources: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPayload {
    List(Vec<RawAlert>),
    Wrapped { alerts: Vec<RawAlert> },
}

/// Parse model text into raw alerts. Tolerates ```json fences.
pub fn parse_alert_payload(text: &str) -> Option<Vec<RawAlert>> {
    let t = text.trim();
    let t = t
        .strip_prefix("```json")
        .or_else(|| t.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(t)
        .trim();
    match serde_json::from_str::<RawPayload>(t).ok()? {
        RawPayload::List(v) => Some(v),
        RawPayload::Wrapped { alerts } => Some(alerts),
    }
}

/// Keep only well-formed alerts about entities present in `evidence`.
///
/// Entity names are matched case-insensitively and rewritten to the tracked
/// spelling. One alert per entity (first wins). Sources must be URLs from that
/// entity's ranked records; they are re-emitted in ranker order, labelled with
/// the model's label or else the record title. An alert left with no sources
/// is dropped.
pub fn validate_alerts(raw: Vec<RawAlert>, evidence: &EntityBuckets) -> Vec<Alert> {
    let mut out: Vec<Alert> = Vec::new();
    for r in raw {
        let title = normalize_text(&r.title);
        if title.is_empty() {
            continue;
        }
        let wanted = r.entity.trim();
        let Some(entity) = evidence.entities().find(|e| e.eq_ignore_ascii_case(wanted)) else {
            continue;
        };
        if out.iter().any(|a| a.entity == entity) {
            continue;
        }
        let ranked = evidence.get(entity).unwrap_or_default();
        let sources: Vec<AlertSource> = ranked
            .iter()
            .filter_map(|rec| {
                let proposed = r.sources.iter().find(|s| s.url.trim() == rec.url)?;
                let label = match proposed.label.trim() {
                    "" => source_label(&rec.title),
                    l => source_label(l),
                };
                Some(AlertSource {
                    label,
                    url: rec.url.clone(),
                })
            })
            .take(MAX_SOURCES_PER_ALERT)
            .collect();
        if sources.is_empty() {
            continue;
        }
        let summary = normalize_text(&r.summary);
        out.push(Alert {
            title,
            entity: entity.to_string(),
            summary: if summary.is_empty() {
                DEFAULT_SUMMARY.to_string()
            } else {
                summary
            },
            sources,
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        });
    }
    out
}

/// Prompt with the evidence serialized as `{entity: [records]}`.
pub fn build_prompt(evidence: &EntityBuckets) -> String {
    let map: serde_json::Map<String, serde_json::Value> = evidence
        .iter()
        .map(|(e, recs)| {
            (
                e.to_string(),
                serde_json::to_value(recs).unwrap_or(serde_json::Value::Null),
            )
        })
        .collect();
    let evidence_json = serde_json::Value::Object(map).to_string();
    format!(
        "You write short country-music news alerts. Using ONLY the evidence below, \
return JSON: {{\"alerts\":[{{\"title\":str,\"entity\":str,\"summary\":str,\
\"sources\":[{{\"label\":str,\"url\":str}}]}}]}}. One alert per entity at most, \
entity must be one of the evidence keys, at most {MAX_SOURCES_PER_ALERT} sources, \
urls copied verbatim from the evidence, neutral tone, no emojis.\n\nEVIDENCE:\n{evidence_json}"
    )
}

// ------------------------------------------------------------
// Concrete enrichers
// ------------------------------------------------------------

/// Gemini `generateContent` with JSON output.
pub struct GeminiEnricher {
    http: reqwest::Client,
    api_key: String,
    url: String,
}

impl GeminiEnricher {
    pub fn new(api_key: String, cfg: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("country-alerts/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        let url = format!("{}/{}:generateContent", cfg.endpoint, cfg.model);
        tracing::debug!(model = %cfg.model, "Gemini enricher ready");
        Ok(Self { http, api_key, url })
    }

    async fn call(&self, prompt: &str) -> Option<String> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            role: &'a str,
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenCfg<'a> {
            temperature: f32,
            response_mime_type: &'a str,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
            generation_config: GenCfg<'a>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<RespContent>,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenCfg {
                temperature: 0.2,
                response_mime_type: "application/json",
            },
        };

        let resp = match self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = ?e, "Gemini request failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "Gemini non-2xx");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let text: String = body
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl AlertEnricher for GeminiEnricher {
    fn produce_alerts<'a>(
        &'a self,
        evidence: &'a EntityBuckets,
    ) -> Pin<Box<dyn Future<Output = Option<Vec<Alert>>> + Send + 'a>> {
        Box::pin(async move {
            if evidence.is_empty() {
                return None;
            }
            let text = self.call(&build_prompt(evidence)).await?;
            let Some(raw) = parse_alert_payload(&text) else {
                tracing::warn!("Gemini returned unparseable payload");
                return None;
            };
            Some(validate_alerts(raw, evidence))
        })
    }
    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// Returns `None` always; used when no model is configured.
pub struct DisabledEnricher;

impl AlertEnricher for DisabledEnricher {
    fn produce_alerts<'a>(
        &'a self,
        _evidence: &'a EntityBuckets,
    ) -> Pin<Box<dyn Future<Output = Option<Vec<Alert>>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic enricher for tests/local runs: headline from the top record.
pub struct MockEnricher;

impl AlertEnricher for MockEnricher {
    fn produce_alerts<'a>(
        &'a self,
        evidence: &'a EntityBuckets,
    ) -> Pin<Box<dyn Future<Output = Option<Vec<Alert>>> + Send + 'a>> {
        let raw: Vec<RawAlert> = evidence
            .iter()
            .filter_map(|(entity, recs)| {
                let top = recs.first()?;
                Some(RawAlert {
                    title: format!("{entity}: {} (mock)", top.title),
                    entity: entity.to_string(),
                    summary: String::new(),
                    sources: recs
                        .iter()
                        .map(|r| RawSource {
                            label: r.title.clone(),
                            url: r.url.clone(),
                        })
                        .collect(),
                })
            })
            .collect();
        let out = validate_alerts(raw, evidence);
        Box::pin(async move { Some(out) })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::dedup::group;
    use crate::ingest::types::{CandidateRecord, RecordSource};

    fn evidence() -> EntityBuckets {
        let rec = |entity: &str, url: &str| CandidateRecord {
            source: RecordSource::Feed,
            entity: Some(entity.into()),
            title: format!("{entity} news"),
            url: url.into(),
            snippet: String::new(),
            published: None,
            trusted: true,
        };
        group(vec![
            rec("Luke Combs", "https://billboard.com/lc"),
            rec("Zach Bryan", "https://variety.com/zb"),
        ])
    }

    #[test]
    fn parses_list_wrapped_and_fenced_payloads() {
        let list = r#"[{"title":"A","entity":"Luke Combs","sources":[]}]"#;
        assert_eq!(parse_alert_payload(list).unwrap().len(), 1);
        let wrapped = r#"{"alerts":[{"headline":"A","artist":"x"},{"title":"B"}]}"#;
        let w = parse_alert_payload(wrapped).unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w[0].title, "A");
        assert_eq!(w[0].entity, "x");
        let fenced = "```json\n{\"alerts\":[]}\n```";
        assert!(parse_alert_payload(fenced).unwrap().is_empty());
        assert!(parse_alert_payload("sorry, I can't").is_none());
    }

    #[test]
    fn validation_drops_malformed_alerts() {
        let raw = vec![
            // unknown entity
            RawAlert {
                title: "X".into(),
                entity: "Nobody".into(),
                sources: vec![RawSource { label: "l".into(), url: "https://a.com".into() }],
                ..Default::default()
            },
            // blank title
            RawAlert {
                title: "  ".into(),
                entity: "Luke Combs".into(),
                sources: vec![RawSource { label: "l".into(), url: "https://a.com".into() }],
                ..Default::default()
            },
            // no usable source
            RawAlert {
                title: "Zach".into(),
                entity: "Zach Bryan".into(),
                sources: vec![RawSource { label: "l".into(), url: "nope".into() }],
                ..Default::default()
            },
            // good, lowercase entity
            RawAlert {
                title: "Combs adds dates".into(),
                entity: "luke combs".into(),
                summary: "".into(),
                sources: vec![RawSource { label: "".into(), url: "https://billboard.com/lc".into() }],
            },
        ];
        let out = validate_alerts(raw, &evidence());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entity, "Luke Combs");
        assert_eq!(out[0].summary, DEFAULT_SUMMARY);
        assert_eq!(out[0].sources[0].label, "Luke Combs news");
    }

    #[test]
    fn sources_outside_the_evidence_are_dropped() {
        let raw = vec![
            RawAlert {
                title: "Invented".into(),
                entity: "Zach Bryan".into(),
                sources: vec![RawSource {
                    label: "x".into(),
                    url: "https://made-up.example/fake".into(),
                }],
                ..Default::default()
            },
            // evidence urls, listed out of order; another entity's url is ignored
            RawAlert {
                title: "Combs".into(),
                entity: "Luke Combs".into(),
                sources: vec![
                    RawSource { label: "zb".into(), url: "https://variety.com/zb".into() },
                    RawSource { label: "fake".into(), url: "https://made-up.example/lc".into() },
                    RawSource { label: "Billboard".into(), url: " https://billboard.com/lc ".into() },
                ],
                ..Default::default()
            },
        ];
        let out = validate_alerts(raw, &evidence());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entity, "Luke Combs");
        assert_eq!(
            out[0].sources,
            vec![AlertSource {
                label: "Billboard".into(),
                url: "https://billboard.com/lc".into()
            }]
        );
    }

    #[test]
    fn prompt_carries_evidence_urls() {
        let p = build_prompt(&evidence());
        assert!(p.contains("https://billboard.com/lc"));
        assert!(p.contains("\"Zach Bryan\""));
    }

    #[tokio::test]
    async fn disabled_enricher_returns_none() {
        assert!(DisabledEnricher.produce_alerts(&evidence()).await.is_none());
    }

    #[tokio::test]
    async fn mock_enricher_covers_every_entity() {
        let ev = evidence();
        let out = MockEnricher.produce_alerts(&ev).await.unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0].title.ends_with("(mock)"));
    }

    #[test]
    fn factory_respects_config() {
        let cfg = AiConfig::default();
        assert_eq!(build_enricher(&cfg).provider_name(), "disabled");
        let cfg = AiConfig {
            test_mode: true,
            ..AiConfig::default()
        };
        assert_eq!(build_enricher(&cfg).provider_name(), "mock");
        let cfg = AiConfig {
            api_key: Some("k".into()),
            ..AiConfig::default()
        };
        assert_eq!(build_enricher(&cfg).provider_name(), "gemini");
    }
}
