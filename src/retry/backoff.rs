use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncGuardError};

/// How the delay before attempt `n` is derived from the base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed cadence: every wait is exactly the base delay. Used by probe
    /// polling, where the interval between attempts is constant.
    Linear,
    /// Scaled cadence: the wait before attempt `n` is `base * n`, so
    /// attempt 1 waits one base delay, attempt 2 waits two, and so on.
    Exponential,
}

/// A bounded retry schedule: how many attempts are allowed and how long to
/// wait between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffSchedule {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl BackoffSchedule {
    pub fn new(max_attempts: u32, base_delay: Duration, strategy: BackoffStrategy) -> Result<Self> {
        if max_attempts == 0 {
            return Err(SyncGuardError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            strategy,
        })
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Result<Self> {
        Self::new(max_attempts, base_delay, BackoffStrategy::Exponential)
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Result<Self> {
        Self::new(max_attempts, delay, BackoffStrategy::Linear)
    }

    /// Delay to impose before attempt `attempt` (1-based). Pure and
    /// deterministic; monotonically non-decreasing in the attempt index.
    ///
    /// # Panics
    ///
    /// Panics if `attempt` is 0. Attempt indices start at 1; passing 0 is a
    /// bug in the caller, not a recoverable condition.
    pub fn delay(&self, attempt: u32) -> Duration {
        assert!(attempt >= 1, "attempt indices start at 1, got {attempt}");
        match self.strategy {
            BackoffStrategy::Linear => self.base_delay,
            BackoffStrategy::Exponential => self.base_delay * attempt,
        }
    }
}
