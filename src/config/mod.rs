// src/config/mod.rs
//! Process-wide configuration, built once at startup and passed down explicitly.
//!
//! Layering (later wins): built-in defaults → optional TOML file → CLI overrides.
//! Credentials only ever come from the environment (`.env` is loaded by `main`).

pub mod ai;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ai::AiConfig;
use crate::ingest::noise::DEFAULT_NOISE_TERMS;
use crate::ingest::providers::search::{SearchCredentials, DEFAULT_SEARCH_ENDPOINT};

pub const ENV_CONFIG_PATH: &str = "COUNTRY_ALERTS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/country_alerts.toml";

pub const DEFAULT_LOOKBACK_HOURS: u32 = 24;
/// Ten years.
pub const MAX_LOOKBACK_HOURS: u32 = 87_600;
pub const DEFAULT_SEARCH_RESULTS: u8 = 8;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 15;

/// Top mainstream, legacy, Americana and rising artists, plus industry topics.
pub const DEFAULT_ENTITIES: &[&str] = &[
    // Core mainstream
    "Morgan Wallen", "Luke Combs", "Lainey Wilson", "Carrie Underwood", "Zach Bryan",
    "Cody Johnson", "Kane Brown", "Jelly Roll", "Kelsea Ballerini", "Miranda Lambert",
    "Reba McEntire", "Eric Church", "Hardy", "Thomas Rhett", "Luke Bryan", "Chris Stapleton",
    // Traditional & legacy
    "George Strait", "Alan Jackson", "Brooks and Dunn", "Garth Brooks", "Trisha Yearwood",
    "Vince Gill", "Shania Twain", "Martina McBride", "Faith Hill", "Tim McGraw",
    // 90s/2000s icons
    "Randy Travis", "Clint Black", "Toby Keith", "Patty Loveless", "The Chicks", "Dwight Yoakam",
    // Storytellers / Americana
    "Tyler Childers", "Sturgill Simpson", "Jason Isbell", "Ashley McBryde", "Margo Price",
    "Caitlyn Smith", "Brent Cobb", "Parker McCollum", "Megan Moroney", "Ernest", "Bailey Zimmerman",
    // Rising & viral
    "Alexandra Kay", "Maggie Baugh", "Tigirlily Gold", "Lauren Watkins", "Chayce Beckham", "Corey Kent",
    // Industry topics
    "Country Music", "Nashville", "CMA Awards", "ACM Awards", "Grand Ole Opry",
    "Country Radio", "Country Charts", "Billboard Country", "Country Music Hall of Fame",
    "Country Touring", "Country Festival", "AI Country Music", "Country TikTok",
    "Country Scandal", "Country Lawsuit", "Country Collaboration", "Country Tribute Show",
];

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://www.billboard.com/feed/",
    "https://www.rollingstone.com/music/music-country/feed/",
    "https://tasteofcountry.com/rss.xml",
    "https://www.theboot.com/rss",
    "https://www.countrynow.com/feed/",
    "https://variety.com/v/music/news/feed/",
    "https://consequence.net/music/feed/",
];

pub const DEFAULT_TRUSTED_HOSTS: &[&str] = &[
    "billboard.com",
    "rollingstone.com",
    "variety.com",
    "countrynow.com",
    "theboot.com",
    "consequence.net",
    "tasteofcountry.com",
];

/// Secrets pulled from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub cse_api_key: Option<String>,
    pub cse_cx: Option<String>,
    pub discord_webhook: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            cse_api_key: non_empty_var("CSE_API_KEY"),
            cse_cx: non_empty_var("CSE_CX"),
            discord_webhook: non_empty_var("DISCORD_WEBHOOK_URL"),
        }
    }

    /// Both key and engine id are required for search.
    pub fn search(&self) -> Option<SearchCredentials> {
        match (&self.cse_api_key, &self.cse_cx) {
            (Some(k), Some(cx)) => Some(SearchCredentials {
                api_key: k.clone(),
                cx: cx.clone(),
            }),
            _ => None,
        }
    }
}

/// Optional overrides read from TOML. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub entities: Option<Vec<String>>,
    pub feeds: Option<Vec<String>>,
    pub trusted_hosts: Option<Vec<String>>,
    pub noise_terms: Option<Vec<String>>,
    pub lookback_hours: Option<u32>,
    pub search_results_per_entity: Option<u8>,
    pub search_endpoint: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub notify_timeout_secs: Option<u64>,
    pub notify_max_chars: Option<usize>,
}

impl FileConfig {
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing config toml")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }
}

/// Command-line overrides.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replaces the whole roster with a single entity.
    pub entity: Option<String>,
    pub lookback_hours: Option<u32>,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub entities: Vec<String>,
    pub feeds: Vec<String>,
    pub trusted_hosts: Vec<String>,
    pub noise_terms: Vec<String>,
    pub lookback_hours: u32,
    pub search_results_per_entity: u8,
    pub search_endpoint: String,
    pub http_timeout_secs: u64,
    pub notify_timeout_secs: u64,
    pub notify_max_chars: usize,
    pub credentials: Credentials,
    pub ai: AiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            entities: to_strings(DEFAULT_ENTITIES),
            feeds: to_strings(DEFAULT_FEEDS),
            trusted_hosts: to_strings(DEFAULT_TRUSTED_HOSTS),
            noise_terms: to_strings(DEFAULT_NOISE_TERMS),
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            search_results_per_entity: DEFAULT_SEARCH_RESULTS,
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            notify_timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
            notify_max_chars: crate::notify::DEFAULT_MAX_CHARS,
            credentials: Credentials::default(),
            ai: AiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Full startup load: file (explicit, env, or default path) + env + CLI overrides.
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let file = load_file(overrides.config_path.as_deref())?;
        let mut cfg =
            Self::from_parts(file, Credentials::from_env(), AiConfig::from_env(), overrides)?;
        if let Some(ep) = non_empty_var("CSE_ENDPOINT") {
            cfg.search_endpoint = ep;
        }
        Ok(cfg)
    }

    /// Pure assembly; validates the result.
    pub fn from_parts(
        file: Option<FileConfig>,
        credentials: Credentials,
        ai: AiConfig,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let mut cfg = AppConfig {
            credentials,
            ai,
            ..AppConfig::default()
        };

        if let Some(f) = file {
            if let Some(v) = f.entities {
                cfg.entities = v;
            }
            if let Some(v) = f.feeds {
                cfg.feeds = v;
            }
            if let Some(v) = f.trusted_hosts {
                cfg.trusted_hosts = v;
            }
            if let Some(v) = f.noise_terms {
                cfg.noise_terms = v;
            }
            if let Some(v) = f.lookback_hours {
                cfg.lookback_hours = v;
            }
            if let Some(v) = f.search_results_per_entity {
                cfg.search_results_per_entity = v;
            }
            if let Some(v) = f.search_endpoint {
                cfg.search_endpoint = v;
            }
            if let Some(v) = f.http_timeout_secs {
                cfg.http_timeout_secs = v;
            }
            if let Some(v) = f.notify_timeout_secs {
                cfg.notify_timeout_secs = v;
            }
            if let Some(v) = f.notify_max_chars {
                cfg.notify_max_chars = v;
            }
        }

        if let Some(e) = overrides.entity {
            cfg.entities = vec![e];
        }
        if let Some(h) = overrides.lookback_hours {
            cfg.lookback_hours = h;
        }

        cfg.entities = clean_list(cfg.entities);
        cfg.feeds = clean_list(cfg.feeds);
        cfg.trusted_hosts = clean_list(cfg.trusted_hosts)
            .into_iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();
        cfg.noise_terms = clean_list(cfg.noise_terms);

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.entities.is_empty() {
            bail!("entity roster is empty");
        }
        if self.lookback_hours == 0 || self.lookback_hours > MAX_LOOKBACK_HOURS {
            bail!(
                "lookback_hours must be in 1..={MAX_LOOKBACK_HOURS}, got {}",
                self.lookback_hours
            );
        }
        if self.http_timeout_secs == 0 || self.notify_timeout_secs == 0 {
            bail!("timeouts must be positive");
        }
        if self.notify_max_chars == 0 {
            bail!("notify_max_chars must be positive");
        }
        for f in &self.feeds {
            if crate::ingest::parse_link(f).is_none() {
                return Err(anyhow!("feed url is not an absolute http(s) url: {f}"));
            }
        }
        Ok(())
    }

    /// One-line, secret-safe description of the environment.
    pub fn describe_env(&self) -> String {
        format!(
            "CSE_API_KEY: {} CSE_CX: {} DISCORD: {} GEMINI: {}",
            mask(self.credentials.cse_api_key.as_deref()),
            self.credentials.cse_cx.as_deref().unwrap_or("<unset>"),
            if self.credentials.discord_webhook.is_some() { "SET" } else { "<unset>" },
            if self.ai.enabled() { "ON" } else { "OFF" },
        )
    }
}

/// Resolve the config file:
/// 1) explicit path (must exist)
/// 2) $COUNTRY_ALERTS_CONFIG (must exist)
/// 3) config/country_alerts.toml if present
fn load_file(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(p) = explicit {
        return FileConfig::load_from(p).map(Some);
    }
    if let Ok(p) = env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
        }
        return FileConfig::load_from(&pb).map(Some);
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default.exists() {
        return FileConfig::load_from(&default).map(Some);
    }
    Ok(None)
}

/// `abcdef...wxyz`; short or missing values are not revealed.
pub fn mask(s: Option<&str>) -> String {
    match s {
        None | Some("") => "<unset>".to_string(),
        Some(v) if v.chars().count() <= 10 => "***".to_string(),
        Some(v) => {
            let chars: Vec<char> = v.chars().collect();
            let head: String = chars[..6].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{head}...{tail}")
        }
    }
}

/// Trim, drop blanks and duplicates, keep first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
