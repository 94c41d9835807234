// src/ingest/providers/feed_rss.rs
//! Syndication feed provider (RSS 2.0, RSS 1.0/RDF and Atom).
//!
//! Each configured feed URL gets its own provider. Entries without a parseable
//! publish/update time, or older than the lookback window, are dropped. An entry
//! that mentions several tracked entities fans out into one record per entity.
//!
//! Parsing is event-driven and lenient: only direct children of an item/entry
//! are read, prefixed extension elements (`media:title`, `atom:link`, ...) are
//! skipped unless listed below, and HTML named entities are decoded instead of
//! failing the document.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::{CandidateRecord, RecordSource, SourceProvider};
use crate::ingest::{normalize_text, parse_link, RecordRules};

/// Only the head of each feed is considered.
pub const MAX_ENTRIES_PER_FEED: usize = 60;

/// Format-independent view of one feed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: Option<String>,
    pub updated: Option<String>,
}

/// Parse RFC 2822 (RSS) or RFC 3339 (Atom, Dublin Core) into UTC.
pub fn parse_feed_time(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    let unix = OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .map(|dt| dt.unix_timestamp())
        .ok()
        .or_else(|| {
            // chrono is laxer about obsolete zone names ("EST", "PDT").
            DateTime::parse_from_rfc2822(ts).ok().map(|dt| dt.timestamp())
        })?;
    DateTime::<Utc>::from_timestamp(unix, 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Rss,
    Atom,
}

impl Format {
    fn from_root(local: &str) -> Option<Self> {
        match local {
            "rss" | "rdf" => Some(Format::Rss),
            "feed" => Some(Format::Atom),
            _ => None,
        }
    }

    fn entry_tag(self) -> &'static str {
        match self {
            Format::Rss => "item",
            Format::Atom => "entry",
        }
    }

    /// Map a child element's qualified name to the field it fills.
    fn field(self, qname: &str) -> Option<Field> {
        match (self, qname) {
            (_, "title") => Some(Field::Title),
            (Format::Rss, "link") => Some(Field::Link),
            (Format::Rss, "description") | (Format::Atom, "summary") => Some(Field::Summary),
            (Format::Rss, "content:encoded") | (Format::Atom, "content") => Some(Field::Content),
            (Format::Rss, "pubdate") | (Format::Atom, "published") => Some(Field::Published),
            (Format::Rss, "dc:date") | (Format::Atom, "updated") => Some(Field::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Content,
    Published,
    Updated,
}

/// Accumulates one item/entry; the first value seen for a field wins.
#[derive(Default)]
struct EntryBuilder {
    title: Option<String>,
    link: Option<String>,
    summary: Option<String>,
    content: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    /// Atom `<link rel=.. href=..>` candidates in document order.
    atom_links: Vec<(Option<String>, String)>,
}

impl EntryBuilder {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
        };
        if slot.is_none() && !value.trim().is_empty() {
            *slot = Some(value);
        }
    }

    fn atom_link(&mut self, e: &BytesStart<'_>) {
        let mut rel = None;
        let mut href = None;
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"rel" => rel = Some(decode_lenient(&attr.value)),
                b"href" => href = Some(decode_lenient(&attr.value)),
                _ => {}
            }
        }
        if let Some(h) = href {
            self.atom_links.push((rel, h));
        }
    }

    fn finish(self) -> FeedEntry {
        let atom_link = self
            .atom_links
            .iter()
            .find(|(rel, _)| matches!(rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.atom_links.first())
            .map(|(_, href)| href.clone());
        FeedEntry {
            title: self.title.unwrap_or_default(),
            link: self
                .link
                .or(atom_link)
                .unwrap_or_default()
                .trim()
                .to_string(),
            summary: self.summary.or(self.content).unwrap_or_default(),
            published: self.published,
            updated: self.updated,
        }
    }
}

/// Decode XML and HTML entities; unknown references stay as written.
fn decode_lenient(raw: &[u8]) -> String {
    html_escape::decode_html_entities(&String::from_utf8_lossy(raw)).into_owned()
}

fn qname(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_lowercase()
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase()
}

/// Parse an RSS or Atom document into entries (document order).
///
/// A syntax error after at least one complete entry keeps what was read.
pub fn parse_entries(xml: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut format: Option<Format> = None;
    let mut depth = 0usize;
    let mut entry_depth = 0usize;
    let mut current: Option<EntryBuilder> = None;
    let mut capture: Option<(Field, String)> = None;
    let mut out = Vec::new();

    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) if !out.is_empty() => {
                tracing::debug!(error = %e, entries = out.len(), "feed truncated; keeping entries");
                break;
            }
            Err(e) => {
                let at = reader.buffer_position();
                return Err(anyhow::Error::new(e).context(format!("parsing feed xml at byte {at}")));
            }
        };

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                if !is_empty {
                    depth += 1;
                }
                let Some(fmt) = format else {
                    let root = local_name(e);
                    format = Some(
                        Format::from_root(&root)
                            .ok_or_else(|| anyhow!("unsupported feed root <{root}>"))?,
                    );
                    continue;
                };

                let name = qname(e);
                if current.is_none() {
                    if !is_empty && name == fmt.entry_tag() {
                        current = Some(EntryBuilder::default());
                        entry_depth = depth;
                    }
                } else if depth == entry_depth + usize::from(!is_empty) {
                    if let Some(entry) = current.as_mut() {
                        if fmt == Format::Atom && name == "link" {
                            entry.atom_link(e);
                        } else if let (Some(field), false) = (fmt.field(&name), is_empty) {
                            capture = Some((field, String::new()));
                        }
                    }
                }
            }
            Event::Text(ref t) => {
                if let Some((_, buf)) = capture.as_mut() {
                    buf.push_str(&decode_lenient(t));
                }
            }
            Event::CData(ref c) => {
                if let Some((_, buf)) = capture.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(c));
                }
            }
            Event::End(_) => {
                if current.is_some() && depth == entry_depth + 1 {
                    if let (Some(entry), Some((field, value))) = (current.as_mut(), capture.take()) {
                        entry.set(field, value);
                    }
                } else if current.is_some() && depth == entry_depth {
                    if let Some(entry) = current.take() {
                        out.push(entry.finish());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if format.is_none() {
        return Err(anyhow!("feed document has no root element"));
    }
    Ok(out)
}

/// Turn parsed entries into candidate records.
///
/// `since` is the lookback cut-off; entries strictly older are dropped.
pub fn entries_to_records(
    entries: Vec<FeedEntry>,
    entities: &[String],
    since: DateTime<Utc>,
    rules: &RecordRules,
) -> Vec<CandidateRecord> {
    let mut out = Vec::new();
    for e in entries.into_iter().take(MAX_ENTRIES_PER_FEED) {
        let Some(published) = e
            .published
            .as_deref()
            .and_then(parse_feed_time)
            .or_else(|| e.updated.as_deref().and_then(parse_feed_time))
        else {
            continue;
        };
        if published < since {
            continue;
        }
        if parse_link(&e.link).is_none() {
            tracing::debug!(link = %e.link, "feed entry without usable link");
            continue;
        }

        let title = normalize_text(&e.title);
        let summary = normalize_text(&e.summary);
        if rules.is_noise(&title, &summary, &e.link) {
            continue;
        }

        let text = format!("{title} {summary}").to_lowercase();
        let trusted = rules.is_trusted(&e.link);
        for entity in entities {
            if text.contains(&entity.to_lowercase()) {
                out.push(CandidateRecord {
                    source: RecordSource::Feed,
                    entity: Some(entity.clone()),
                    title: title.clone(),
                    url: e.link.clone(),
                    snippet: summary.clone(),
                    published: Some(published),
                    trusted,
                });
            }
        }
    }
    out
}

pub struct FeedProvider {
    mode: Mode,
    rules: RecordRules,
    lookback: chrono::Duration,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl FeedProvider {
    pub fn from_url(
        url: impl Into<String>,
        rules: RecordRules,
        lookback_hours: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("country-alerts/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
            rules,
            lookback: chrono::Duration::hours(i64::from(lookback_hours)),
        })
    }

    /// Serve a fixed document instead of fetching (tests, offline runs).
    pub fn from_fixture_str(xml: &str, rules: RecordRules, lookback_hours: u32) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
            rules,
            lookback: chrono::Duration::hours(i64::from(lookback_hours)),
        }
    }

    pub fn location(&self) -> &str {
        match &self.mode {
            Mode::Fixture(_) => "fixture",
            Mode::Http { url, .. } => url,
        }
    }

    async fn body(&self) -> Result<String> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("feed http get {url}"))?;
                if !resp.status().is_success() {
                    return Err(anyhow!("feed {url} returned {}", resp.status()));
                }
                resp.text().await.context("feed http .text()")
            }
        }
    }
}

#[async_trait]
impl SourceProvider for FeedProvider {
    async fn fetch_latest(&self, entities: &[String]) -> Result<Vec<CandidateRecord>> {
        let body = self.body().await?;

        let t0 = std::time::Instant::now();
        let entries =
            parse_entries(&body).with_context(|| format!("feed {}", self.location()))?;
        let since = Utc::now()
            .checked_sub_signed(self.lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let out = entries_to_records(entries, entities, since, &self.rules);
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        tracing::debug!(feed = self.location(), records = out.len(), "feed parsed");
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}
