// src/notify/discord.rs
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{truncate_message, Notifier, DEFAULT_MAX_CHARS};

/// Discord webhook sink. One attempt per message, no retries.
#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: Option<String>,
    client: Client,
    timeout: Duration,
    max_chars: usize,
}

#[derive(Serialize)]
struct DiscordWebhookPayload<'a> {
    content: &'a str,
}

impl DiscordNotifier {
    pub fn new(webhook: Option<String>) -> Self {
        Self {
            webhook: webhook.filter(|w| !w.trim().is_empty()),
            client: Client::new(),
            timeout: Duration::from_secs(15),
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("DISCORD_WEBHOOK_URL").ok())
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook.is_some()
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let Some(url) = &self.webhook else {
            tracing::debug!("Discord disabled (no DISCORD_WEBHOOK_URL)");
            return Ok(());
        };

        let payload = DiscordWebhookPayload {
            content: truncate_message(message, self.max_chars),
        };
        let rsp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("Discord webhook request failed")?;
        if let Err(e) = rsp.error_for_status_ref() {
            return Err(anyhow!("Discord webhook HTTP error: {e}"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_webhook_disables() {
        assert!(!DiscordNotifier::new(Some("  ".into())).is_enabled());
        assert!(!DiscordNotifier::new(None).is_enabled());
        assert!(DiscordNotifier::new(Some("https://discord.test/hook".into())).is_enabled());
    }

    #[tokio::test]
    async fn disabled_send_is_a_noop() {
        let n = DiscordNotifier::new(None);
        assert!(n.send("hello").await.is_ok());
    }
}
