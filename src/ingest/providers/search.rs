// src/ingest/providers/search.rs
//! Web-search provider (Google Custom Search JSON API shape).
//!
//! One query per tracked entity, restricted to the trusted hosts via `site:`.
//! Missing credentials or a failed request degrade to zero records for that
//! entity; the provider itself never errors.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::types::{CandidateRecord, RecordSource, SourceProvider};
use crate::ingest::{normalize_text, parse_link, RecordRules};

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Keyword hints OR-ed onto every entity query.
pub const QUERY_HINTS: &[&str] = &[
    "news",
    "announces",
    "reveals",
    "controversy",
    "tour",
    "release",
    "update",
    "statement",
    "apology",
    "backlash",
    "lawsuit",
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// `"<entity>" (news OR announces ...) site:(a.com OR b.com)`
pub fn build_query<S: AsRef<str>>(entity: &str, hosts: &[S]) -> String {
    let hints = QUERY_HINTS.join(" OR ");
    let mut q = format!("\"{entity}\" ({hints})");
    let sites: Vec<&str> = hosts.iter().map(|h| h.as_ref()).collect();
    if !sites.is_empty() {
        q.push_str(&format!(" site:({})", sites.join(" OR ")));
    }
    q
}

/// Parse one API response body into records attributed to `entity`.
pub fn parse_items(
    body: &str,
    entity: &str,
    rules: &RecordRules,
) -> Result<Vec<CandidateRecord>> {
    let resp: SearchResponse = serde_json::from_str(body).context("parsing search response")?;
    let mut out = Vec::new();
    for it in resp.items.unwrap_or_default() {
        let link = it.link.trim();
        if parse_link(link).is_none() {
            continue;
        }
        let title = normalize_text(&it.title);
        let snippet = normalize_text(&it.snippet);
        if rules.is_noise(&title, &snippet, link) {
            continue;
        }
        out.push(CandidateRecord {
            source: RecordSource::Search,
            entity: Some(entity.to_string()),
            title,
            url: link.to_string(),
            snippet,
            published: None,
            trusted: rules.is_trusted(link),
        });
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct SearchCredentials {
    pub api_key: String,
    pub cx: String,
}

pub struct SearchProvider {
    endpoint: String,
    credentials: Option<SearchCredentials>,
    client: reqwest::Client,
    rules: RecordRules,
    num: u8,
}

impl SearchProvider {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Option<SearchCredentials>,
        rules: RecordRules,
        num: u8,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("country-alerts/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("building search http client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            credentials,
            client,
            rules,
            // the API rejects num outside 1..=10
            num: num.clamp(1, 10),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn search_entity(
        &self,
        creds: &SearchCredentials,
        entity: &str,
    ) -> Result<Vec<CandidateRecord>> {
        let query = build_query(entity, &self.rules.trusted_hosts);
        let num = self.num.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", creds.api_key.as_str()),
                ("cx", creds.cx.as_str()),
                ("q", query.as_str()),
                ("num", num.as_str()),
                ("safe", "active"),
                ("hl", "en"),
            ])
            .send()
            .await
            .context("search http get")?;
        if !resp.status().is_success() {
            return Err(anyhow!("search api returned {}", resp.status()));
        }
        let body = resp.text().await.context("search http .text()")?;
        parse_items(&body, entity, &self.rules)
    }
}

#[async_trait]
impl SourceProvider for SearchProvider {
    async fn fetch_latest(&self, entities: &[String]) -> Result<Vec<CandidateRecord>> {
        let Some(creds) = &self.credentials else {
            tracing::debug!("search disabled (no CSE_API_KEY / CSE_CX)");
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for entity in entities {
            match self.search_entity(creds, entity).await {
                Ok(mut v) => out.append(&mut v),
                Err(e) => {
                    tracing::warn!(error = ?e, entity = %entity, "search query failed");
                    metrics::counter!("ingest_provider_errors_total").increment(1);
                }
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "cse"
    }
}
