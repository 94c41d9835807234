// src/notify/mod.rs
//! Notification sinks. Delivery is best-effort: callers log and move on.

pub mod discord;

use anyhow::Result;
use std::sync::{Arc, Mutex};

pub use discord::DiscordNotifier;

/// Discord rejects content over 2000 chars; stay under it.
pub const DEFAULT_MAX_CHARS: usize = 1900;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn send(&self, message: &str) -> Result<()> {
        (**self).send(message).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Truncate to at most `max_chars` characters (not bytes).
pub fn truncate_message(message: &str, max_chars: usize) -> &str {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}

/// Logs messages instead of sending them (`--dry-run`).
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        tracing::info!(
            chars = message.chars().count(),
            "dry-run message:\n{message}"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Keeps every message in memory; handy for tests and demos.
#[derive(Default)]
pub struct MemoryNotifier {
    pub sent: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let msg = truncate_message(message, DEFAULT_MAX_CHARS).to_string();
        if let Ok(mut g) = self.sent.lock() {
            g.push(msg);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
