//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, temperature in [0, 2])
//! - Check endpoint and proxy URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ChatConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use url::Url;

use crate::config::schema::ChatConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ChatConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.model.model.trim().is_empty() {
        errors.push(ValidationError::new("model.model", "must not be empty"));
    }
    if config.model.max_tokens == 0 {
        errors.push(ValidationError::new("model.max_tokens", "must be positive"));
    }
    if !(0.0..=2.0).contains(&config.model.temperature) {
        errors.push(ValidationError::new("model.temperature", "must be between 0 and 2"));
    }

    if config.endpoints.urls.is_empty() {
        errors.push(ValidationError::new("endpoints.urls", "at least one endpoint is required"));
    }
    for (i, raw) in config.endpoints.urls.iter().enumerate() {
        match Url::parse(raw) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::new(
                format!("endpoints.urls[{}]", i),
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                format!("endpoints.urls[{}]", i),
                format!("invalid URL '{}': {}", raw, e),
            )),
        }
    }
    if let Some(proxy) = &config.endpoints.proxy_url {
        if let Err(e) = Url::parse(proxy) {
            errors.push(ValidationError::new(
                "endpoints.proxy_url",
                format!("invalid URL '{}': {}", proxy, e),
            ));
        }
    }

    if config.credentials.prefix.is_empty() {
        errors.push(ValidationError::new("credentials.prefix", "must not be empty"));
    }

    let timeouts = &config.timeouts;
    if timeouts.request_ms == 0 {
        errors.push(ValidationError::new("timeouts.request_ms", "must be positive"));
    }
    if timeouts.connect_ms == 0 {
        errors.push(ValidationError::new("timeouts.connect_ms", "must be positive"));
    }
    if !(timeouts.preferred_multiplier.is_finite() && timeouts.preferred_multiplier >= 1.0) {
        errors.push(ValidationError::new(
            "timeouts.preferred_multiplier",
            "must be a finite number of at least 1.0",
        ));
    }
    for (field, growth) in [
        ("timeouts.request_growth", timeouts.request_growth),
        ("timeouts.connect_growth", timeouts.connect_growth),
    ] {
        if !(growth.is_finite() && growth >= 0.0) {
            errors.push(ValidationError::new(field, "must be a finite, non-negative number"));
        }
    }

    if config.retries.budget() == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "retry budget must be positive"));
    }

    if config.store.history_cap == 0 {
        errors.push(ValidationError::new("store.history_cap", "must be positive"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
