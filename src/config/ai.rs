// src/config/ai.rs
use std::env;

pub const DEFAULT_GEMINI_MODEL: &str = "models/gemini-2.5-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Enrichment settings. Enabled iff an API key is present (or test mode is on).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    /// `AI_TEST_MODE=mock` swaps the real provider for a deterministic one.
    pub test_mode: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout_secs: 30,
            test_mode: false,
        }
    }
}

impl AiConfig {
    /// GEMINI_API_KEY, falling back to GOOGLE_API_KEY; GEMINI_MODEL; GEMINI_ENDPOINT.
    pub fn from_env() -> Self {
        let api_key = non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("GOOGLE_API_KEY"));
        let model =
            non_empty_var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let endpoint =
            non_empty_var("GEMINI_ENDPOINT").unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string());
        let test_mode = env::var("AI_TEST_MODE").map(|v| v == "mock").unwrap_or(false);
        Self {
            api_key,
            model: normalize_model(&model),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            test_mode,
            ..Self::default()
        }
    }

    pub fn enabled(&self) -> bool {
        self.test_mode || self.api_key.is_some()
    }
}

/// Accept both "gemini-2.5-flash" and "models/gemini-2.5-flash".
pub fn normalize_model(model: &str) -> String {
    let m = model.trim();
    if m.starts_with("models/") {
        m.to_string()
    } else {
        format!("models/{m}")
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
