//! Runtime configuration loaded from an optional `config.yaml`.
//!
//! Every field has a default, so a partial file (or no file at all) is valid:
//!
//! ```yaml
//! model: gemini-2.0-flash
//! chunk_size: 5
//! fallback_heading: Other Coverage
//! pdf_command: ["report-layout", "--stdin"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

use crate::error::NewsError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Gemini model name.
    pub model: String,
    /// Base URL of the Generative Language API.
    pub api_base: String,
    /// Maximum number of articles sent to the model in one request.
    pub chunk_size: usize,
    /// Total attempts per chunk, including the first.
    pub max_attempts: usize,
    pub request_timeout_secs: u64,
    /// Initial backoff between attempts; doubles on each retry.
    pub backoff_base_ms: u64,
    pub temperature: f32,
    /// Heading for articles of a chunk whose categorization failed.
    /// `null` drops those articles instead.
    pub fallback_heading: Option<String>,
    pub feed_base_url: String,
    pub feed_timeout_secs: u64,
    /// External layout command producing a PDF from report JSON on stdin.
    pub pdf_command: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            chunk_size: 10,
            max_attempts: 3,
            request_timeout_secs: 60,
            backoff_base_ms: 1000,
            temperature: 0.2,
            fallback_heading: Some("Uncategorized".to_string()),
            feed_base_url: "https://news.google.com/rss/search".to_string(),
            feed_timeout_secs: 15,
            pdf_command: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, NewsError> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), NewsError> {
        if self.chunk_size == 0 {
            return Err(NewsError::Config("chunk_size must be at least 1".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(NewsError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(NewsError::Config("model must not be empty".to_string()));
        }
        if self
            .fallback_heading
            .as_deref()
            .is_some_and(|h| h.trim().is_empty())
        {
            return Err(NewsError::Config(
                "fallback_heading must not be blank; use null to disable it".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

/// Load configuration from `path`, or return defaults when no path is given.
#[instrument(level = "info")]
pub async fn load_config(path: Option<&Path>) -> Result<AppConfig, NewsError> {
    let Some(path) = path else {
        info!("No config file given; using defaults");
        return Ok(AppConfig::default());
    };
    let yaml = tokio::fs::read_to_string(path).await?;
    let config = AppConfig::from_yaml(&yaml)?;
    info!(config_path = %path.display(), model = %config.model, chunk_size = config.chunk_size, "Loaded configuration");
    Ok(config)
}
