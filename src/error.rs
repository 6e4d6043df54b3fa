//! Error types for each stage of the pipeline.
//!
//! Only [`ConfigError`], [`SourceError`] and [`PipelineError`] ever reach
//! `main`. [`RetrievalError`] and [`LlmError`] are captured per item and
//! folded into the report as a failed retrieval or a sentinel analysis.

use crate::retry::{Classify, FailureKind};
use std::path::PathBuf;

/// Problems building the run configuration. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required credentials: {names} (set them in the environment or a .env file)")]
    MissingCredentials { names: String },

    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Failures fetching the trend list itself. Always fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{provider} request failed: {message}")]
    Request { provider: &'static str, message: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned malformed data: {message}")]
    Malformed { provider: &'static str, message: String },

    #[error("{provider} returned no trend items")]
    Empty { provider: &'static str },
}

/// Per-item content retrieval failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetrievalError {
    #[error("invalid or unsupported URL format: {url}")]
    InvalidUrl { url: String },

    #[error("invalid or unsupported YouTube URL format: {url}")]
    NoVideoId { url: String },

    #[error("rate limited: {message}")]
    RateLimited { message: String },

    #[error("content unavailable: {message}")]
    Unavailable { message: String },

    #[error("request failed: {message}")]
    Transport { message: String },

    #[error("unexpected response: {message}")]
    Malformed { message: String },
}

impl RetrievalError {
    /// Map a non-success HTTP status to the matching failure subtype.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status.as_u16(), crate::utils::truncate_for_log(body, 200));
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            RetrievalError::RateLimited { message }
        } else if status.is_server_error() {
            RetrievalError::Transport { message }
        } else {
            RetrievalError::Unavailable { message }
        }
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(e: reqwest::Error) -> Self {
        RetrievalError::Transport {
            message: e.to_string(),
        }
    }
}

impl Classify for RetrievalError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            RetrievalError::RateLimited { .. } => FailureKind::RateLimited,
            RetrievalError::Transport { .. } => FailureKind::Transient,
            RetrievalError::InvalidUrl { .. }
            | RetrievalError::NoVideoId { .. }
            | RetrievalError::Unavailable { .. }
            | RetrievalError::Malformed { .. } => FailureKind::Permanent,
        }
    }
}

/// Failures talking to the LLM provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("rate limited by provider: {message}")]
    RateLimited { message: String },

    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request failed: {message}")]
    Transport { message: String },

    #[error("response parse error: {message}")]
    ResponseParse { message: String, truncated: bool },
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Transport {
            message: e.to_string(),
        }
    }
}

impl Classify for LlmError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            LlmError::RateLimited { .. } => FailureKind::RateLimited,
            LlmError::Api { status, .. } if *status >= 500 => FailureKind::Transient,
            LlmError::Api { .. } => FailureKind::Permanent,
            LlmError::Transport { .. } => FailureKind::Transient,
            // A cut-off tool payload is worth asking for again.
            LlmError::ResponseParse { truncated, .. } => {
                if *truncated {
                    FailureKind::Transient
                } else {
                    FailureKind::Permanent
                }
            }
        }
    }
}

/// Errors that halt a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("report inputs are misaligned: {items} items, {retrievals} retrievals, {analyses} analyses")]
    Misaligned {
        items: usize,
        retrievals: usize,
        analyses: usize,
    },

    #[error("failed to write output {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_429_is_rate_limited() {
        let e = RetrievalError::from_status(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(e.failure_kind(), FailureKind::RateLimited);
    }

    #[test]
    fn test_status_503_is_transient() {
        let e = RetrievalError::from_status(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(e.failure_kind(), FailureKind::Transient);
    }

    #[test]
    fn test_status_404_is_permanent() {
        let e = RetrievalError::from_status(StatusCode::NOT_FOUND, "gone");
        assert_eq!(e.failure_kind(), FailureKind::Permanent);
        assert!(e.to_string().contains("HTTP 404"));
    }

    #[test]
    fn test_invalid_url_is_permanent_and_descriptive() {
        let e = RetrievalError::InvalidUrl {
            url: "not-a-url".into(),
        };
        assert_eq!(e.failure_kind(), FailureKind::Permanent);
        assert_eq!(e.to_string(), "invalid or unsupported URL format: not-a-url");
    }

    #[test]
    fn test_llm_error_classification() {
        let rate = LlmError::RateLimited {
            message: "quota".into(),
        };
        let server = LlmError::Api {
            status: 502,
            body: String::new(),
        };
        let client = LlmError::Api {
            status: 400,
            body: String::new(),
        };
        let cut = LlmError::ResponseParse {
            message: "EOF".into(),
            truncated: true,
        };
        let garbage = LlmError::ResponseParse {
            message: "expected value".into(),
            truncated: false,
        };
        assert_eq!(rate.failure_kind(), FailureKind::RateLimited);
        assert_eq!(server.failure_kind(), FailureKind::Transient);
        assert_eq!(client.failure_kind(), FailureKind::Permanent);
        assert_eq!(cut.failure_kind(), FailureKind::Transient);
        assert_eq!(garbage.failure_kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_missing_credentials_message_lists_names() {
        let e = ConfigError::MissingCredentials {
            names: "SearchAPI_KEY, OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("SearchAPI_KEY, OPENAI_API_KEY"));
    }
}
