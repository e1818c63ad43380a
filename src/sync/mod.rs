mod coordinator;
mod remote;
mod runner;

pub use coordinator::{PullReport, PushReport, RemoteSyncCoordinator, SyncState, SyncTarget};
pub use remote::{PushOutcome, RebaseOutcome, RemoteRepository};
pub use runner::GitCliRepository;
