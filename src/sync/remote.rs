use async_trait::async_trait;

use crate::error::Result;

/// What the remote said to a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Completed,
    /// The remote has commits the pusher lacks; a rebase is required before
    /// any further push can succeed.
    Rejected { reason: String },
}

/// What happened when local commits were reapplied onto the remote base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    Completed,
    /// Content conflicts that must be resolved by a human.
    Conflict { detail: String },
}

/// The version-control collaborator the coordinator drives. One instance maps
/// to one working tree; implementations only need to be honest about
/// rejection and conflict outcomes, everything else propagates as an error.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    async fn has_local_changes(&self) -> Result<bool>;

    /// Stage everything and commit with `message`. `Ok(false)` means there
    /// was nothing to commit, which callers treat as a no-op success.
    async fn stage_and_commit(&self, message: &str) -> Result<bool>;

    async fn push(&self, remote: &str, branch: &str) -> Result<PushOutcome>;

    async fn fetch(&self, remote: &str, branch: &str) -> Result<()>;

    async fn local_position(&self, branch: &str) -> Result<String>;

    async fn remote_position(&self, remote: &str, branch: &str) -> Result<String>;

    /// Rebase local commits onto the updated remote base. On conflict the
    /// implementation must leave the working tree clean (abort the rebase)
    /// before reporting [`RebaseOutcome::Conflict`].
    async fn pull_rebase(&self, remote: &str, branch: &str) -> Result<RebaseOutcome>;

    async fn pull(&self, remote: &str, branch: &str) -> Result<()>;
}
