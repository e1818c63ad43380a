mod backoff;
mod executor;

pub use backoff::{BackoffSchedule, BackoffStrategy};
pub use executor::{retry, Attempt, AttemptOutcome, RetryExecutor, RetryExhausted};
