use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use country_alerts::analyze::ai_adapter::{DisabledEnricher, MockEnricher};
use country_alerts::engine::{Pipeline, RunOutcome, NO_ALERTS_MESSAGE, NO_SIGNALS_MESSAGE};
use country_alerts::ingest::providers::FeedProvider;
use country_alerts::ingest::types::{CandidateRecord, RecordSource, SourceProvider};
use country_alerts::ingest::RecordRules;
use country_alerts::notify::{MemoryNotifier, Notifier};

/// Returns canned records regardless of the roster.
struct StaticProvider(Vec<CandidateRecord>);

#[async_trait]
impl SourceProvider for StaticProvider {
    async fn fetch_latest(&self, _entities: &[String]) -> Result<Vec<CandidateRecord>> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

struct BrokenProvider;

#[async_trait]
impl SourceProvider for BrokenProvider {
    async fn fetch_latest(&self, _entities: &[String]) -> Result<Vec<CandidateRecord>> {
        Err(anyhow!("upstream down"))
    }
    fn name(&self) -> &'static str {
        "broken"
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _message: &str) -> Result<()> {
        Err(anyhow!("webhook 500"))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

fn rules() -> RecordRules {
    RecordRules::new(
        Default::default(),
        vec!["billboard.com".into(), "tasteofcountry.com".into()],
    )
}

fn feed_xml(items: &[(&str, &str, &str)]) -> String {
    let at = (Utc::now() - Duration::hours(1)).to_rfc2822();
    let body: String = items
        .iter()
        .map(|(title, link, desc)| {
            format!(
                "<item><title>{title}</title><link>{link}</link>\
<description>{desc}</description><pubDate>{at}</pubDate></item>"
            )
        })
        .collect();
    format!(r#"<rss version="2.0"><channel>{body}</channel></rss>"#)
}

fn feed(items: &[(&str, &str, &str)]) -> Box<dyn SourceProvider> {
    Box::new(FeedProvider::from_fixture_str(&feed_xml(items), rules(), 24))
}

fn search_rec(entity: &str, title: &str, url: &str) -> CandidateRecord {
    CandidateRecord {
        source: RecordSource::Search,
        entity: Some(entity.into()),
        title: title.into(),
        url: url.into(),
        snippet: String::new(),
        published: None,
        trusted: rules().is_trusted(url),
    }
}

fn roster(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn trusted_feed_entry_becomes_the_sole_source() {
    let sink = Arc::new(MemoryNotifier::new());
    let pipeline = Pipeline::new(
        roster(&["Luke Combs", "Hardy"]),
        vec![feed(&[(
            "Luke Combs Announces Tour",
            "https://www.billboard.com/music/luke-combs-tour",
            "Stadium dates for next year",
        )])],
        vec![],
        Arc::new(DisabledEnricher),
        Box::new(sink.clone()),
    );

    let summary = pipeline.run().await;
    assert_eq!(summary.outcome, RunOutcome::Alerted);
    assert_eq!(summary.feed_hits, 1);
    assert_eq!(summary.alerts_built, 1);
    assert_eq!(summary.alerts_sent, 1);

    let msgs = sink.messages();
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].starts_with("📰 Luke Combs — Recent Mentions\n"));
    assert!(msgs[0].contains("Luke Combs Announces Tour"));
}

#[tokio::test]
async fn duplicate_url_keeps_the_feed_record() {
    let url = "https://tasteofcountry.com/zach-bryan-album";
    let sink = Arc::new(MemoryNotifier::new());
    let pipeline = Pipeline::new(
        roster(&["Zach Bryan"]),
        vec![feed(&[("Zach Bryan drops album", url, "")])],
        vec![Box::new(StaticProvider(vec![search_rec(
            "Zach Bryan",
            "Search copy of the album story",
            url,
        )]))],
        Arc::new(DisabledEnricher),
        Box::new(sink.clone()),
    );

    let summary = pipeline.run().await;
    assert_eq!(summary.feed_hits, 1);
    assert_eq!(summary.search_hits, 1);
    assert_eq!(summary.duplicates, 1);
    let msgs = sink.messages();
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].contains("Zach Bryan drops album"));
    assert!(!msgs[0].contains("Search copy"));
}

#[tokio::test]
async fn nothing_retrieved_sends_one_no_signal_message() {
    let sink = Arc::new(MemoryNotifier::new());
    let pipeline = Pipeline::new(
        roster(&["Hardy"]),
        vec![feed(&[]), Box::new(BrokenProvider)],
        vec![Box::new(StaticProvider(vec![]))],
        Arc::new(MockEnricher),
        Box::new(sink.clone()),
    );

    let summary = pipeline.run().await;
    assert_eq!(summary.outcome, RunOutcome::NoSignals);
    assert_eq!(summary.alerts_built, 0);
    assert_eq!(sink.messages(), vec![NO_SIGNALS_MESSAGE.to_string()]);
}

#[tokio::test]
async fn playlist_noise_never_reaches_a_bucket() {
    let sink = Arc::new(MemoryNotifier::new());
    let pipeline = Pipeline::new(
        roster(&["Hardy"]),
        vec![feed(&[(
            "Hardy on the radio",
            "https://www.billboard.com/hardy-radio",
            "Featured in the best curated playlist this week",
        )])],
        vec![],
        Arc::new(DisabledEnricher),
        Box::new(sink.clone()),
    );

    let summary = pipeline.run().await;
    assert_eq!(summary.outcome, RunOutcome::NoSignals);
    assert_eq!(sink.messages(), vec![NO_SIGNALS_MESSAGE.to_string()]);
}

#[tokio::test]
async fn records_without_entity_yield_no_alerts_message() {
    let mut orphan = search_rec("x", "Orphan", "https://www.billboard.com/orphan");
    orphan.entity = None;
    let sink = Arc::new(MemoryNotifier::new());
    let pipeline = Pipeline::new(
        roster(&["Hardy"]),
        vec![],
        vec![Box::new(StaticProvider(vec![orphan]))],
        Arc::new(DisabledEnricher),
        Box::new(sink.clone()),
    );

    let summary = pipeline.run().await;
    assert_eq!(summary.outcome, RunOutcome::NoAlerts);
    assert_eq!(sink.messages(), vec![NO_ALERTS_MESSAGE.to_string()]);
}

#[tokio::test]
async fn enricher_output_is_sent_when_available() {
    let sink = Arc::new(MemoryNotifier::new());
    let pipeline = Pipeline::new(
        roster(&["Hardy"]),
        vec![],
        vec![Box::new(StaticProvider(vec![search_rec(
            "Hardy",
            "Hardy tour news",
            "https://www.billboard.com/hardy",
        )]))],
        Arc::new(MockEnricher),
        Box::new(sink.clone()),
    );

    let summary = pipeline.run().await;
    assert_eq!(summary.alerts_enriched, 1);
    assert_eq!(summary.composer, "mock");
    let msgs = sink.messages();
    assert!(msgs[0].starts_with("📰 Hardy: Hardy tour news (mock)"));
}

#[tokio::test]
async fn delivery_failures_do_not_abort_the_run() {
    let pipeline = Pipeline::new(
        roster(&["Hardy", "Ernest"]),
        vec![],
        vec![Box::new(StaticProvider(vec![
            search_rec("Hardy", "Hardy news", "https://www.billboard.com/hardy"),
            search_rec("Ernest", "Ernest news", "https://www.billboard.com/ernest"),
        ]))],
        Arc::new(DisabledEnricher),
        Box::new(FailingNotifier),
    );

    let summary = pipeline.run().await;
    assert_eq!(summary.outcome, RunOutcome::Alerted);
    assert_eq!(summary.alerts_built, 2);
    assert_eq!(summary.alerts_sent, 0);
}
