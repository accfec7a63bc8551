//! Retry budget for one `complete()` call.
//!
//! # Responsibilities
//! - Count failed attempts against the configured budget
//! - Allow credential rotations that do not spend budget
//!
//! # Design Decisions
//! - At most `credentials - 1` free rotations per call, so a call makes no
//!   more than `budget + credentials` network attempts
//! - Budget is per call; nothing is shared between concurrent calls

/// Attempt accounting for a single call.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    limit: u32,
    used: u32,
    free_rotations: u32,
}

impl RetryBudget {
    pub fn new(limit: u32, credentials: usize) -> Self {
        Self {
            limit,
            used: 0,
            free_rotations: credentials.saturating_sub(1) as u32,
        }
    }

    /// Counted attempts so far.
    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Spend one attempt.
    pub fn record_failure(&mut self) {
        self.used = self.used.saturating_add(1);
    }

    /// Take a free credential rotation if any is left.
    pub fn try_rotation(&mut self) -> bool {
        if self.free_rotations == 0 {
            return false;
        }
        self.free_rotations -= 1;
        true
    }
}
