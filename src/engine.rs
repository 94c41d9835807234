// src/engine.rs
//! One stateless run: retrieve → aggregate → dedup/group → rank → compose → notify.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::analyze::{build_enricher, compose_alerts, group_and_rank, DynEnricher};
use crate::config::AppConfig;
use crate::ingest::providers::{FeedProvider, SearchProvider};
use crate::ingest::types::SourceProvider;
use crate::ingest::{aggregate, collect, ensure_metrics_described, RecordRules};
use crate::notify::{DiscordNotifier, Notifier};
use crate::render::alert_message;

pub const NO_SIGNALS_MESSAGE: &str = "CountryMusicAgent: no fresh signals in this cycle.";
pub const NO_ALERTS_MESSAGE: &str = "CountryMusicAgent: no alerts triggered this run.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// At least one alert was composed and handed to the notifier.
    Alerted,
    /// Nothing retrieved from any source.
    NoSignals,
    /// Records were retrieved but none survived into an alert.
    NoAlerts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub feed_hits: usize,
    pub search_hits: usize,
    pub entities: usize,
    pub duplicates: usize,
    pub alerts_built: usize,
    pub alerts_enriched: usize,
    pub alerts_sent: usize,
    pub outcome: RunOutcome,
    /// Enricher in effect ("disabled" when only rules composed).
    pub composer: &'static str,
}

impl RunSummary {
    fn empty(
        feed_hits: usize,
        search_hits: usize,
        entities: usize,
        outcome: RunOutcome,
        composer: &'static str,
    ) -> Self {
        Self {
            feed_hits,
            search_hits,
            entities,
            duplicates: 0,
            alerts_built: 0,
            alerts_enriched: 0,
            alerts_sent: 0,
            outcome,
            composer,
        }
    }
}

/// Everything a run needs, wired once from config.
pub struct Pipeline {
    entities: Vec<String>,
    feeds: Vec<Box<dyn SourceProvider>>,
    search: Vec<Box<dyn SourceProvider>>,
    enricher: DynEnricher,
    notifier: Box<dyn Notifier>,
}

impl Pipeline {
    pub fn new(
        entities: Vec<String>,
        feeds: Vec<Box<dyn SourceProvider>>,
        search: Vec<Box<dyn SourceProvider>>,
        enricher: DynEnricher,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            entities,
            feeds,
            search,
            enricher,
            notifier,
        }
    }

    /// Production wiring: one feed provider per URL, Google CSE, Gemini (if keyed), Discord.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let rules = RecordRules::from_config(cfg);
        let timeout = Duration::from_secs(cfg.http_timeout_secs);

        let mut feeds: Vec<Box<dyn SourceProvider>> = Vec::with_capacity(cfg.feeds.len());
        for url in &cfg.feeds {
            feeds.push(Box::new(FeedProvider::from_url(
                url.clone(),
                rules.clone(),
                cfg.lookback_hours,
                timeout,
            )?));
        }

        let search: Vec<Box<dyn SourceProvider>> = vec![Box::new(SearchProvider::new(
            cfg.search_endpoint.clone(),
            cfg.credentials.search(),
            rules,
            cfg.search_results_per_entity,
            timeout,
        )?)];

        let notifier = DiscordNotifier::new(cfg.credentials.discord_webhook.clone())
            .with_timeout(cfg.notify_timeout_secs)
            .with_max_chars(cfg.notify_max_chars);

        Ok(Self::new(
            cfg.entities.clone(),
            feeds,
            search,
            build_enricher(&cfg.ai),
            Box::new(notifier),
        ))
    }

    /// Swap the sink (e.g. `--dry-run`).
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn enricher_name(&self) -> &'static str {
        self.enricher.provider_name()
    }

    pub fn notifier_name(&self) -> &'static str {
        self.notifier.name()
    }

    /// Run once. Source, enrichment and delivery failures are absorbed.
    pub async fn run(&self) -> RunSummary {
        ensure_metrics_described();

        let feed = collect(&self.feeds, &self.entities).await;
        let search = collect(&self.search, &self.entities).await;
        let (feed_hits, search_hits) = (feed.len(), search.len());

        info!(
            "RSS:{} CSE:{} Artists:{}",
            feed_hits,
            search_hits,
            self.entities.len()
        );
        for h in feed.iter().take(3).chain(search.iter().take(3)) {
            debug!(
                entity = h.entity.as_deref().unwrap_or("-"),
                title = %h.title,
                url = %h.url,
                "sample hit"
            );
        }

        let merged = aggregate(feed, search);
        if merged.is_empty() {
            info!("No fresh signals found.");
            self.deliver(NO_SIGNALS_MESSAGE).await;
            return RunSummary::empty(0, 0, 0, RunOutcome::NoSignals, self.enricher_name());
        }

        let ranked = group_and_rank(merged);
        let duplicates = ranked.duplicates();
        let report = compose_alerts(self.enricher.as_ref(), &ranked).await;

        if report.alerts.is_empty() {
            info!("No alerts triggered.");
            self.deliver(NO_ALERTS_MESSAGE).await;
            let mut s = RunSummary::empty(
                feed_hits,
                search_hits,
                ranked.len(),
                RunOutcome::NoAlerts,
                self.enricher_name(),
            );
            s.duplicates = duplicates;
            return s;
        }

        let now = Utc::now();
        let mut sent = 0usize;
        for alert in &report.alerts {
            let msg = alert_message(alert, now);
            debug!(
                id = %alert.fingerprint(),
                entity = %alert.entity,
                sources = alert.sources.len(),
                "sending alert"
            );
            if self.deliver(&msg).await {
                counter!("alerts_sent_total").increment(1);
                sent += 1;
            }
        }

        info!(
            sent,
            built = report.alerts.len(),
            notifier = self.notifier.name(),
            "Sent {} alert(s).",
            sent
        );

        RunSummary {
            feed_hits,
            search_hits,
            entities: ranked.len(),
            duplicates,
            alerts_built: report.alerts.len(),
            alerts_enriched: report.enriched,
            alerts_sent: sent,
            outcome: RunOutcome::Alerted,
            composer: self.enricher_name(),
        }
    }

    /// Single best-effort delivery; returns whether it succeeded.
    async fn deliver(&self, message: &str) -> bool {
        match self.notifier.send(message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = ?e, notifier = self.notifier.name(), "notify failed");
                counter!("notify_errors_total").increment(1);
                false
            }
        }
    }
}
