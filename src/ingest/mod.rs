// src/ingest/mod.rs
pub mod noise;
pub mod providers;
pub mod types;

use crate::ingest::noise::NoiseFilter;
use crate::ingest::types::{CandidateRecord, SourceProvider};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_records_total",
            "Candidate records emitted by providers."
        );
        describe_counter!(
            "ingest_noise_total",
            "Entries dropped by the playlist-noise classifier."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Feed or search fetch/parse errors."
        );
        describe_counter!(
            "digest_dedup_total",
            "Records removed by URL deduplication."
        );
        describe_counter!("alerts_sent_total", "Alert messages handed to the notifier.");
        describe_counter!("notify_errors_total", "Failed notifier deliveries.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Normalize markup to plain text: strip tags, decode entities, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)<[^>]+>").unwrap());
    let stripped = re_tags.replace_all(s, " ");

    // 2) HTML entity decode
    let decoded = html_escape::decode_html_entities(&stripped);

    // 3) Collapse whitespace (incl. nbsp)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").unwrap());
    let mut out = re_ws.replace_all(&decoded, " ").trim().to_string();

    // 4) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Parse an absolute http(s) locator; `None` for anything else.
pub fn parse_link(link: &str) -> Option<url::Url> {
    let parsed = url::Url::parse(link.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed),
        _ => None,
    }
}

/// True iff the link's host is one of `hosts` or a subdomain of one.
pub fn is_trusted<S: AsRef<str>>(link: &str, hosts: &[S]) -> bool {
    let Some(parsed) = parse_link(link) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    hosts.iter().any(|h| {
        let h = h.as_ref().trim().to_ascii_lowercase();
        !h.is_empty() && (host == h || host.ends_with(&format!(".{h}")))
    })
}

/// Noise vocabulary + trusted hosts, shared by both providers.
#[derive(Debug, Clone, Default)]
pub struct RecordRules {
    pub noise: NoiseFilter,
    pub trusted_hosts: Vec<String>,
}

impl RecordRules {
    pub fn new(noise: NoiseFilter, trusted_hosts: Vec<String>) -> Self {
        Self {
            noise,
            trusted_hosts,
        }
    }

    pub fn from_config(cfg: &crate::config::AppConfig) -> Self {
        Self::new(
            NoiseFilter::new(&cfg.noise_terms),
            cfg.trusted_hosts.clone(),
        )
    }

    pub fn is_noise(&self, title: &str, snippet: &str, url: &str) -> bool {
        let noisy = self.noise.is_noise(title, snippet, url);
        if noisy {
            counter!("ingest_noise_total").increment(1);
        }
        noisy
    }

    pub fn is_trusted(&self, link: &str) -> bool {
        is_trusted(link, &self.trusted_hosts)
    }
}

/// Feed records first, then search records, each in arrival order.
pub fn aggregate(
    feed: Vec<CandidateRecord>,
    search: Vec<CandidateRecord>,
) -> Vec<CandidateRecord> {
    let mut merged = feed;
    merged.reserve(search.len());
    merged.extend(search);
    merged
}

/// Run providers one after another. A failing provider contributes nothing.
pub async fn collect(
    providers: &[Box<dyn SourceProvider>],
    entities: &[String],
) -> Vec<CandidateRecord> {
    ensure_metrics_described();

    let mut out = Vec::new();
    for p in providers {
        match p.fetch_latest(entities).await {
            Ok(mut v) => {
                tracing::debug!(provider = p.name(), records = v.len(), "provider done");
                counter!("ingest_records_total", "provider" => p.name()).increment(v.len() as u64);
                out.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }
    out
}
