//! Country music mention alerts: binary entrypoint.
//! One stateless run per invocation; schedule it externally (cron, CI, systemd timer).

use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use country_alerts::config::{AppConfig, ConfigOverrides};
use country_alerts::engine::Pipeline;
use country_alerts::notify::LogNotifier;

#[derive(Parser, Debug)]
#[command(name = "country-alerts", version, about = "Country music mention alerts")]
struct Cli {
    /// Track a single artist or topic instead of the full roster.
    entity: Option<String>,

    /// Only keep feed entries newer than this many hours.
    #[arg(long)]
    lookback_hours: Option<u32>,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compose alerts but log them instead of posting to Discord.
    #[arg(long)]
    dry_run: bool,
}

/// `LOG_FORMAT=json` switches to JSON lines; `RUST_LOG` overrides the filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("country_alerts=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = AppConfig::load(ConfigOverrides {
        entity: cli.entity,
        lookback_hours: cli.lookback_hours,
        config_path: cli.config,
    })?;

    info!("{}", cfg.describe_env());
    debug!(
        entities = cfg.entities.len(),
        feeds = cfg.feeds.len(),
        lookback_hours = cfg.lookback_hours,
        "config loaded"
    );

    let mut pipeline = Pipeline::from_config(&cfg)?;
    if cli.dry_run {
        pipeline = pipeline.with_notifier(Box::new(LogNotifier));
    }
    info!(
        enricher = pipeline.enricher_name(),
        notifier = pipeline.notifier_name(),
        "starting run"
    );

    let summary = pipeline.run().await;
    println!(
        "feed_hits={} search_hits={} entities={} alerts={} sent={} outcome={:?} composer={}",
        summary.feed_hits,
        summary.search_hits,
        summary.entities,
        summary.alerts_built,
        summary.alerts_sent,
        summary.outcome,
        summary.composer
    );
    Ok(())
}
