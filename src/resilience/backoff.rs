//! Backoff delays chosen by failure kind, with jitter for rate limits.

use std::time::Duration;
use rand::Rng;

use crate::config::BackoffConfig;
use crate::resilience::FailureKind;

/// Delay before the next attempt.
///
/// `timeouts_seen` is the number of timeouts observed so far in the current
/// call, including the one being handled.
pub fn delay_for(kind: FailureKind, timeouts_seen: u32, config: &BackoffConfig) -> Duration {
    let ms = match kind {
        FailureKind::Timeout => {
            let extra = config
                .timeout_step_ms
                .saturating_mul(timeouts_seen as u64)
                .min(config.timeout_extra_max_ms);
            config.timeout_base_ms.saturating_add(extra)
        }
        FailureKind::RateLimited => {
            let jitter = if config.rate_limit_jitter_ms > 0 {
                rand::thread_rng().gen_range(0..config.rate_limit_jitter_ms)
            } else {
                0
            };
            config.rate_limit_base_ms.saturating_add(jitter)
        }
        FailureKind::Unauthorized => config.auth_rotation_ms,
        FailureKind::NetworkUnreachable | FailureKind::Http => config.base_ms,
    };
    Duration::from_millis(ms)
}
