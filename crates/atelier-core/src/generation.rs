//! Generation client contract.
//!
//! Defines the interface the orchestration layer uses to talk to a
//! generative-language backend, along with the failure taxonomy shared by
//! every implementation.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Substrings that identify a rate-limit or quota-exhaustion failure.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "resource_exhausted",
    "resource exhausted",
    "rate limit",
    "quota",
    "429",
];

/// Failure returned by a [`GenerationClient`].
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    /// The backend answered with a non-success HTTP status.
    #[error("{}", format_api_error(*status_code, status.as_deref(), message))]
    Api {
        status_code: Option<u16>,
        /// Provider status text, e.g. `RESOURCE_EXHAUSTED`
        status: Option<String>,
        message: String,
        is_retryable: bool,
        retry_after: Option<Duration>,
    },

    /// The request never produced an HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Client is not usable (missing API key, bad base URL, ...).
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// The backend answered but the response carried no usable text.
    #[error("Empty response: {0}")]
    EmptyResponse(String),
}

fn format_api_error(status_code: Option<u16>, status: Option<&str>, message: &str) -> String {
    match (status_code, status) {
        (Some(code), Some(status)) => format!("API error {code} {status}: {message}"),
        (Some(code), None) => format!("API error {code}: {message}"),
        (None, Some(status)) => format!("API error {status}: {message}"),
        (None, None) => format!("API error: {message}"),
    }
}

impl GenerationError {
    /// Creates a Misconfiguration error
    pub fn misconfiguration(message: impl Into<String>) -> Self {
        Self::Misconfiguration(message.into())
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates an Api error from a status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code: Some(status_code),
            status: None,
            message: message.into(),
            is_retryable: status_code == 429 || status_code >= 500,
            retry_after: None,
        }
    }

    /// Returns true when the failure signals rate limiting or quota exhaustion.
    ///
    /// Detection looks at the HTTP status (429), the provider status text
    /// (`RESOURCE_EXHAUSTED`), and finally at well-known markers in the
    /// message. Configuration failures are never treated as rate limits.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Api {
                status_code,
                status,
                message,
                ..
            } => {
                if *status_code == Some(429) {
                    return true;
                }
                if status
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case("RESOURCE_EXHAUSTED"))
                {
                    return true;
                }
                contains_rate_limit_marker(message)
            }
            Self::Transport(message) => contains_rate_limit_marker(message),
            Self::Misconfiguration(_) | Self::EmptyResponse(_) => false,
        }
    }

    /// Server-suggested wait before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

fn contains_rate_limit_marker(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Backend capable of generating free-form and schema-constrained output.
///
/// Implementations must be cheap to share (`Arc<dyn GenerationClient>`) and
/// must never panic on malformed backend output.
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generates free-form text (prose, markdown, or HTML) for a single role.
    async fn generate_text(
        &self,
        prompt: &str,
        system_instructions: &str,
    ) -> Result<String, GenerationError>;

    /// Generates a JSON object constrained by `schema`.
    ///
    /// If the backend returns something that is not valid JSON, implementations
    /// return an empty JSON object instead of failing.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> Result<Value, GenerationError>;
}
