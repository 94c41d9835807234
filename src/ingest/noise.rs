// src/ingest/noise.rs
//! Playlist-noise classifier.
//!
//! A record is noise when its title, snippet or URL mentions a playlist term.
//! Any occurrence of "history" wins over the vocabulary, so retrospectives like
//! "a history of the country playlist" are kept. Matching is plain substring
//! matching on the lowercased text, so "playlisted" also counts as noise.

use once_cell::sync::OnceCell;

pub const DEFAULT_NOISE_TERMS: &[&str] = &[
    "playlist",
    "playlists",
    "spotify playlist",
    "apple music playlist",
    "best playlist",
    "curated playlist",
];

const OVERRIDE_TERM: &str = "history";

static DEFAULT_FILTER: OnceCell<NoiseFilter> = OnceCell::new();

/// Classify with the built-in vocabulary.
pub fn is_noise(title: &str, snippet: &str, url: &str) -> bool {
    DEFAULT_FILTER
        .get_or_init(NoiseFilter::default)
        .is_noise(title, snippet, url)
}

/// Classifier with a configurable vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseFilter {
    terms: Vec<String>,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_TERMS.iter().map(|s| s.to_string()))
    }
}

impl NoiseFilter {
    /// Terms are lowercased; blanks are dropped.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_noise(&self, title: &str, snippet: &str, url: &str) -> bool {
        let text = joined_lower(title, snippet, url);
        if text.contains(OVERRIDE_TERM) {
            return false;
        }
        self.terms.iter().any(|t| text.contains(t.as_str()))
    }
}

fn joined_lower(title: &str, snippet: &str, url: &str) -> String {
    format!("{title} {snippet} {url}").to_lowercase()
}
