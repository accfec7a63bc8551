//! Timeout enforcement.
//!
//! # Responsibilities
//! - Derive per-attempt request and connect deadlines from config
//! - Relax deadlines for the preferred endpoint
//! - Track the adaptive factor that stretches later attempts
//!
//! # Design Decisions
//! - `AttemptTimeouts` is an immutable value computed per attempt
//! - The adaptive factor is clamped on every update and on load

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TimeoutConfig;

/// Multiplier in [1.0, 2.0] scaling timeout growth after failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct AdaptiveTimeoutFactor(f64);

impl AdaptiveTimeoutFactor {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 2.0;
    pub const STEP: f64 = 0.1;

    /// Clamp an arbitrary value into bounds. NaN becomes the minimum.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(Self::MIN);
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn on_success(&mut self) {
        *self = Self::new(self.0 - Self::STEP);
    }

    pub fn on_failure(&mut self) {
        *self = Self::new(self.0 + Self::STEP);
    }
}

impl Default for AdaptiveTimeoutFactor {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl From<f64> for AdaptiveTimeoutFactor {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<AdaptiveTimeoutFactor> for f64 {
    fn from(factor: AdaptiveTimeoutFactor) -> Self {
        factor.0
    }
}

/// Deadlines for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTimeouts {
    /// Hard deadline for the whole request and response body.
    pub request: Duration,
    /// Connection establishment limit.
    pub connect: Duration,
}

impl AttemptTimeouts {
    /// Relaxed deadlines for the last known good endpoint.
    pub fn preferred(config: &TimeoutConfig) -> Self {
        Self {
            request: scale(config.request_ms, config.preferred_multiplier),
            connect: scale(config.connect_ms, config.preferred_multiplier),
        }
    }

    /// Deadlines after `attempts_so_far` counted attempts.
    pub fn scaled(config: &TimeoutConfig, attempts_so_far: u32, factor: AdaptiveTimeoutFactor) -> Self {
        let n = attempts_so_far as f64;
        Self {
            request: scale(config.request_ms, 1.0 + n * config.request_growth * factor.value()),
            connect: scale(config.connect_ms, 1.0 + n * config.connect_growth * factor.value()),
        }
    }
}

fn scale(base_ms: u64, multiplier: f64) -> Duration {
    Duration::from_millis((base_ms as f64 * multiplier).round() as u64)
}
