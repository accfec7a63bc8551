//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the chat client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the chat client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ChatConfig {
    /// Model parameters sent with every request.
    pub model: ModelConfig,

    /// Completion endpoints in priority order.
    pub endpoints: EndpointsConfig,

    /// Credential file settings.
    pub credentials: CredentialConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry budget.
    pub retries: RetryConfig,

    /// Backoff delays per failure class.
    pub backoff: BackoffConfig,

    /// Connectivity probe settings.
    pub probe: ProbeConfig,

    /// Persistent store settings.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Model parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name (e.g., "gpt-3.5-turbo").
    pub model: String,

    /// Maximum tokens in the reply.
    pub max_tokens: u32,

    /// Sampling temperature, 0.0 to 2.0.
    pub temperature: f32,

    /// System prompt prepended when the conversation has none.
    pub system_prompt: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            system_prompt: Some("You are a helpful AI assistant.".to_string()),
        }
    }
}

/// Endpoint list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Chat-completion URLs, highest priority first.
    pub urls: Vec<String>,

    /// Optional outbound HTTP proxy for all requests.
    pub proxy_url: Option<String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            urls: vec![
                "https://api.openai.com/v1/chat/completions".to_string(),
                "https://api.openai-proxy.com/v1/chat/completions".to_string(),
                "https://api.openai-asia.com/v1/chat/completions".to_string(),
                "https://api.gptapi.us/v1/chat/completions".to_string(),
                "https://api.gptapi.top/v1/chat/completions".to_string(),
                "https://gpt.pawan.krd/v1/chat/completions".to_string(),
                "https://api-proxy.gpt.ge/v1/chat/completions".to_string(),
            ],
            proxy_url: None,
        }
    }
}

/// Credential file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Path to the line-oriented credential file.
    pub path: String,

    /// Lines starting with this prefix are credentials.
    pub prefix: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            path: "apikey.txt".to_string(),
            prefix: "sk-".to_string(),
        }
    }
}

/// Timeout configuration for completion attempts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Base request timeout (whole request/response) in milliseconds.
    pub request_ms: u64,

    /// Base connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Multiplier applied to both timeouts for the preferred endpoint.
    pub preferred_multiplier: f64,

    /// Request timeout growth per prior attempt, scaled by the adaptive factor.
    pub request_growth: f64,

    /// Connect timeout growth per prior attempt, scaled by the adaptive factor.
    pub connect_growth: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 90_000,
            connect_ms: 20_000,
            preferred_multiplier: 1.2,
            request_growth: 0.2,
            connect_growth: 0.3,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of counted attempts per call.
    pub max_attempts: u32,

    /// Grant `auto_retry_bonus` extra attempts.
    pub auto_retry: bool,

    /// Extra attempts when `auto_retry` is on.
    pub auto_retry_bonus: u32,
}

impl RetryConfig {
    /// Total counted attempts allowed for one call.
    pub fn budget(&self) -> u32 {
        if self.auto_retry {
            self.max_attempts.saturating_add(self.auto_retry_bonus)
        } else {
            self.max_attempts
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            auto_retry: true,
            auto_retry_bonus: 2,
        }
    }
}

/// Backoff delays, all in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Flat delay for uncategorised failures.
    pub base_ms: u64,

    /// Base delay after a timeout.
    pub timeout_base_ms: u64,

    /// Added per timeout seen in the current call.
    pub timeout_step_ms: u64,

    /// Cap on the timeout-frequency component.
    pub timeout_extra_max_ms: u64,

    /// Base delay after HTTP 429.
    pub rate_limit_base_ms: u64,

    /// Upper bound of random jitter after HTTP 429.
    pub rate_limit_jitter_ms: u64,

    /// Delay after rotating to another credential.
    pub auth_rotation_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: 1000,
            timeout_base_ms: 2000,
            timeout_step_ms: 500,
            timeout_extra_max_ms: 3000,
            rate_limit_base_ms: 3000,
            rate_limit_jitter_ms: 2000,
            auth_rotation_ms: 500,
        }
    }
}

/// Connectivity probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Enable fire-and-forget probes between attempts.
    pub enabled: bool,

    /// Probes fire once consecutive failures exceed this.
    pub failure_threshold: u32,

    /// Hosts probed between attempts.
    pub urls: Vec<String>,

    /// URLs used by the start-up connectivity pre-test.
    pub pretest_urls: Vec<String>,

    /// Timeout for each pre-test request in milliseconds.
    pub pretest_timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 2,
            urls: vec![
                "https://www.baidu.com/favicon.ico".to_string(),
                "https://www.163.com/favicon.ico".to_string(),
            ],
            pretest_urls: vec![
                "https://www.baidu.com/".to_string(),
                "https://cdn.jsdelivr.net/npm/axios/dist/axios.min.js".to_string(),
                "https://cdnjs.cloudflare.com/ajax/libs/jquery/3.6.0/jquery.min.js".to_string(),
                "https://www.qq.com/".to_string(),
            ],
            pretest_timeout_ms: 3000,
        }
    }
}

/// Persistent store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON store file.
    pub path: String,

    /// Maximum number of endpoints kept in connection history.
    pub history_cap: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "failover-chat.json".to_string(),
            history_cap: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
