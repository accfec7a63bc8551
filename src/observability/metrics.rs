//! Metrics collection.
//!
//! # Metrics
//! - `chat_attempts_total` (counter): attempts by endpoint, outcome
//! - `chat_attempt_duration_seconds` (histogram): attempt latency by endpoint
//! - `chat_credential_rotations_total` (counter)
//! - `chat_adaptive_timeout_factor` (gauge)
//!
//! No exporter is installed by this crate; embedders pick a recorder.

use std::time::Duration;

/// Record one attempt. `outcome` is `success` or a failure label.
pub fn record_attempt(endpoint: &str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "chat_attempts_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "chat_attempt_duration_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_credential_rotation() {
    metrics::counter!("chat_credential_rotations_total").increment(1);
}

pub fn record_adaptive_factor(value: f64) {
    metrics::gauge!("chat_adaptive_timeout_factor").set(value);
}
