//! Error taxonomy for the coverage pipeline.
//!
//! Fatal, request-level failures (`Fetch`, `AllChunksFailed`, `Render`, ...)
//! surface to the caller as a single descriptive message. `CategorizationFailed`
//! is scoped to one chunk and is normally recovered by the pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsError {
    /// The feed endpoint was unreachable or returned data that could not be parsed.
    #[error("failed to fetch feed {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The feed parsed but contained no usable entries.
    #[error("no articles found for topic \"{topic}\"")]
    NoArticlesFound { topic: String },

    /// The AI provider answered with a non-success status.
    #[error("AI provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The model answered, but not with a usable categorization.
    #[error("malformed AI response: {0}")]
    MalformedResponse(String),

    #[error("categorization failed for chunk {chunk}: {reason}")]
    CategorizationFailed { chunk: usize, reason: String },

    #[error("all {chunks} chunk(s) failed categorization; last error: {last_error}")]
    AllChunksFailed { chunks: usize, last_error: String },

    #[error("render error: {0}")]
    Render(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl NewsError {
    /// Whether another attempt at the same AI request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            NewsError::Http(_) | NewsError::MalformedResponse(_) => true,
            NewsError::Api { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let rate_limited = NewsError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        let unavailable = NewsError::Api {
            status: 503,
            message: "overloaded".to_string(),
        };
        let forbidden = NewsError::Api {
            status: 403,
            message: "bad key".to_string(),
        };
        assert!(rate_limited.is_transient());
        assert!(unavailable.is_transient());
        assert!(!forbidden.is_transient());
    }

    #[test]
    fn test_malformed_is_transient_but_config_is_not() {
        assert!(NewsError::MalformedResponse("eof".to_string()).is_transient());
        assert!(!NewsError::Config("chunk_size".to_string()).is_transient());
    }

    #[test]
    fn test_messages_are_descriptive() {
        let err = NewsError::CategorizationFailed {
            chunk: 2,
            reason: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "categorization failed for chunk 2: timeout");

        let err = NewsError::NoArticlesFound {
            topic: "Harry Styles".to_string(),
        };
        assert_eq!(err.to_string(), "no articles found for topic \"Harry Styles\"");
    }
}
