//! Completion result and error definitions.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::resilience::FailureKind;

/// Remediation hints attached to `AllEndpointsExhausted`.
pub const DEFAULT_SUGGESTIONS: &[&str] = &[
    "Check that the credential file contains a valid, unexpired API key",
    "Retry later; the service may be under transient load or rate limiting",
    "Try another network (e.g. a mobile hotspot)",
    "Check firewall, proxy and security software policies for blocked API requests",
    "Configure endpoints.proxy_url if direct access to the API is restricted",
];

/// A model reply and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Reply text from `choices[0].message.content`.
    pub content: String,
    /// Endpoint that produced the reply.
    pub endpoint: String,
    /// Model name reported by the server, if any.
    pub model: Option<String>,
    /// Latency of the successful attempt.
    pub response_time: Duration,
    /// Network attempts made in this call, including the successful one.
    pub attempts: u32,
    pub request_id: Uuid,
}

/// Errors that can occur while obtaining a completion.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Input or setup is unusable; raised before any network I/O.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Attempt deadline expired and the request was aborted.
    #[error("Request to {endpoint} timed out after {after_ms}ms")]
    Timeout { endpoint: String, after_ms: u64 },

    /// HTTP 429.
    #[error("Rate limited by {endpoint} (HTTP 429)")]
    RateLimited { endpoint: String },

    /// HTTP 401.
    #[error("Authorization rejected by {endpoint} (HTTP 401)")]
    Unauthorized { endpoint: String },

    /// Connection failed or broke.
    #[error("Network unreachable for {endpoint}: {message}")]
    NetworkUnreachable { endpoint: String, message: String },

    /// Any other non-success status.
    #[error("HTTP {status} from {endpoint}: {message}")]
    Http {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Success status but the body is not a usable completion.
    #[error("Malformed response from {endpoint}: {message}")]
    MalformedResponse { endpoint: String, message: String },

    /// Every endpoint failed within the retry budget.
    #[error(
        "All endpoints failed after {attempts} attempts ({}). Last error: {last_error}\n\nSuggestions:\n{}",
        join_endpoints(.attempted),
        format_suggestions(.suggestions)
    )]
    AllEndpointsExhausted {
        attempts: u32,
        attempted: Vec<String>,
        last_error: Box<ChatError>,
        suggestions: Vec<String>,
    },
}

impl ChatError {
    /// Retryable class, or `None` for errors that propagate immediately.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ChatError::Timeout { .. } => Some(FailureKind::Timeout),
            ChatError::RateLimited { .. } => Some(FailureKind::RateLimited),
            ChatError::Unauthorized { .. } => Some(FailureKind::Unauthorized),
            ChatError::NetworkUnreachable { .. } => Some(FailureKind::NetworkUnreachable),
            ChatError::Http { .. } => Some(FailureKind::Http),
            ChatError::Precondition(_)
            | ChatError::MalformedResponse { .. }
            | ChatError::AllEndpointsExhausted { .. } => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.failure_kind().is_some()
    }

    /// Build the terminal error from the last failure.
    pub fn exhausted(attempts: u32, attempted: Vec<String>, last_error: ChatError) -> Self {
        ChatError::AllEndpointsExhausted {
            attempts,
            attempted,
            last_error: Box::new(last_error),
            suggestions: DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn join_endpoints(endpoints: &[String]) -> String {
    endpoints.join(", ")
}

fn format_suggestions(suggestions: &[String]) -> String {
    suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
