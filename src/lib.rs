pub mod config;
pub mod error;
pub mod health;
pub mod probe;
pub mod retry;
pub mod sync;

pub use config::GuardConfig;
pub use error::{Result, SyncGuardError};
pub use health::{AggregateReport, HealthCheckAggregator};
pub use probe::{
    ContainerProber, HttpProber, ProbeKind, ProbeResult, ProbeSpec, Prober, ProberSet,
    ProcessProber, TcpProber,
};
pub use retry::{
    retry, Attempt, AttemptOutcome, BackoffSchedule, BackoffStrategy, RetryExecutor, RetryExhausted,
};
pub use sync::{
    GitCliRepository, PullReport, PushOutcome, PushReport, RebaseOutcome, RemoteRepository,
    RemoteSyncCoordinator, SyncState, SyncTarget,
};
