// src/lib.rs
// Library surface shared by the binary and integration tests.

pub mod analyze;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod notify;
pub mod render;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use crate::config::{AppConfig, ConfigOverrides};
pub use crate::engine::{Pipeline, RunOutcome, RunSummary};
pub use crate::ingest::types::{CandidateRecord, RecordSource, SourceProvider};
pub use crate::notify::{DiscordNotifier, LogNotifier, MemoryNotifier, Notifier};
