use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::backoff::BackoffSchedule;

/// Outcome of a single attempt inside a retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    TransientFailure(String),
    FatalFailure(String),
}

/// Immutable record of one attempt, kept for diagnostics and tracing.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    /// 1-based attempt index.
    pub index: u32,
    /// Delay that was imposed before this attempt ran (zero for the first).
    pub scheduled_delay: Duration,
    pub outcome: AttemptOutcome,
}

impl Attempt {
    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// Every allowed attempt failed (or the caller cancelled the loop). Carries
/// the full per-attempt trail so operators can see what happened on each try.
#[derive(Debug, Clone)]
pub struct RetryExhausted {
    pub operation: String,
    pub attempts: Vec<Attempt>,
    pub cancelled: bool,
}

impl RetryExhausted {
    fn exhausted(operation: &str, attempts: Vec<Attempt>) -> Self {
        Self {
            operation: operation.to_string(),
            attempts,
            cancelled: false,
        }
    }

    fn cancelled(operation: &str, attempts: Vec<Attempt>) -> Self {
        Self {
            operation: operation.to_string(),
            attempts,
            cancelled: true,
        }
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|a| match &a.outcome {
            AttemptOutcome::TransientFailure(reason) | AttemptOutcome::FatalFailure(reason) => {
                Some(reason.as_str())
            }
            AttemptOutcome::Success => None,
        })
    }
}

impl fmt::Display for RetryExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            write!(
                f,
                "'{}' cancelled after {} attempt(s)",
                self.operation,
                self.attempts.len()
            )
        } else {
            write!(
                f,
                "'{}' failed after {} attempt(s)",
                self.operation,
                self.attempts.len()
            )?;
            if let Some(reason) = self.last_failure() {
                write!(f, ": {}", reason)?;
            }
            Ok(())
        }
    }
}

impl std::error::Error for RetryExhausted {}

/// Drives bounded retries of an arbitrary fallible async operation.
///
/// Every failed attempt is treated as transient and retried; only exhausting
/// the schedule (or cancellation) surfaces an error, and that error is always
/// [`RetryExhausted`]. Callers decide whether that is fatal to the process.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    cancel: CancellationToken,
}

impl RetryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// An executor whose sleeps and loops abort promptly when `cancel` fires.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: &str,
        schedule: &BackoffSchedule,
        run: F,
    ) -> std::result::Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        self.execute_with_attempts(operation, schedule, run)
            .await
            .map(|(value, _)| value)
    }

    /// Like [`execute`](Self::execute), but also returns the per-attempt
    /// trail on success, for callers that report diagnostics either way.
    pub async fn execute_with_attempts<F, Fut, T, E>(
        &self,
        operation: &str,
        schedule: &BackoffSchedule,
        mut run: F,
    ) -> std::result::Result<(T, Vec<Attempt>), RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempts = Vec::with_capacity(schedule.max_attempts as usize);
        let mut scheduled_delay = Duration::ZERO;

        for index in 1..=schedule.max_attempts {
            if self.cancel.is_cancelled() {
                return Err(RetryExhausted::cancelled(operation, attempts));
            }

            match run().await {
                Ok(value) => {
                    debug!(operation, attempt = index, "Attempt succeeded");
                    attempts.push(Attempt {
                        index,
                        scheduled_delay,
                        outcome: AttemptOutcome::Success,
                    });
                    return Ok((value, attempts));
                }
                Err(err) => {
                    let reason = err.to_string();
                    attempts.push(Attempt {
                        index,
                        scheduled_delay,
                        outcome: AttemptOutcome::TransientFailure(reason.clone()),
                    });

                    if index == schedule.max_attempts {
                        warn!(
                            operation,
                            attempts = index,
                            error = %reason,
                            "Retry budget exhausted"
                        );
                        break;
                    }

                    scheduled_delay = schedule.delay(index);
                    warn!(
                        operation,
                        attempt = index,
                        max_attempts = schedule.max_attempts,
                        delay_ms = scheduled_delay.as_millis() as u64,
                        error = %reason,
                        "Attempt failed, retrying after delay"
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(scheduled_delay) => {}
                        _ = self.cancel.cancelled() => {
                            return Err(RetryExhausted::cancelled(operation, attempts));
                        }
                    }
                }
            }
        }

        Err(RetryExhausted::exhausted(operation, attempts))
    }
}

/// Standalone retry helper for callers that do not need to hold an executor.
pub async fn retry<F, Fut, T, E>(
    operation: &str,
    schedule: &BackoffSchedule,
    run: F,
) -> std::result::Result<T, RetryExhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: fmt::Display,
{
    RetryExecutor::new().execute(operation, schedule, run).await
}
