use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncGuardError};
use crate::retry::{Attempt, AttemptOutcome, BackoffSchedule, RetryExecutor, RetryExhausted};

use super::remote::{PushOutcome, RebaseOutcome, RemoteRepository};

/// The unit being synchronized. Created at the call site and discarded when
/// the operation returns; nothing persists between invocations.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub branch: String,
    pub remote: String,
    /// Commit message for uncommitted local changes. When absent, the
    /// working tree is pushed as-is.
    pub message: Option<String>,
}

impl SyncTarget {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            remote: "origin".to_string(),
            message: None,
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Phases of a sync-push run, in the order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    StageCommit,
    PushAttempt,
    PushOk,
    PushRejected,
    PullRebase,
    RetryPush,
    Verify,
    Verified,
    VerifyFailed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::StageCommit => "stage_commit",
            Self::PushAttempt => "push_attempt",
            Self::PushOk => "push_ok",
            Self::PushRejected => "push_rejected",
            Self::PullRebase => "pull_rebase",
            Self::RetryPush => "retry_push",
            Self::Verify => "verify",
            Self::Verified => "verified",
            Self::VerifyFailed => "verify_failed",
        };
        f.write_str(name)
    }
}

/// Successful sync-push outcome, including the per-attempt trail for
/// diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    /// Commit id both sides agree on after verification.
    pub final_position: String,
    /// Whether a new commit was created from local changes.
    pub committed: bool,
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PullReport {
    /// True when local and remote already matched and no pull ran.
    pub was_up_to_date: bool,
}

/// Orchestrates stage-commit, push, rebase-on-rejection, bounded retry, and
/// post-push verification against one remote branch.
///
/// A single call is linear, and both operations take `&mut self`, so no two
/// sync operations can run concurrently through one coordinator. Keep one
/// coordinator per branch and within-target serialization follows.
pub struct RemoteSyncCoordinator<R: RemoteRepository> {
    repo: R,
    schedule: BackoffSchedule,
    cancel: CancellationToken,
}

impl<R: RemoteRepository> RemoteSyncCoordinator<R> {
    pub fn new(repo: R, schedule: BackoffSchedule) -> Self {
        Self {
            repo,
            schedule,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight waits promptly when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Stage-commit local changes (if a message is given), push with bounded
    /// retries, rebasing on rejection when `auto_resolve` is set, then verify
    /// that the remote actually ended up at the local position.
    ///
    /// A rejected push is never retried without a rebase first: retrying a
    /// bare push against a stale base would fail identically every time.
    pub async fn sync_push(
        &mut self,
        target: &SyncTarget,
        auto_resolve: bool,
    ) -> Result<PushReport> {
        info!(
            branch = %target.branch,
            remote = %target.remote,
            auto_resolve,
            state = %SyncState::StageCommit,
            "Starting sync push"
        );

        let committed = match &target.message {
            Some(message) if self.repo.has_local_changes().await? => {
                self.repo.stage_and_commit(message).await?
            }
            // No changes (or no message): staging is a no-op success.
            _ => false,
        };

        let mut attempts: Vec<Attempt> = Vec::new();
        let mut scheduled_delay = Duration::ZERO;
        let mut pushed = false;

        for index in 1..=self.schedule.max_attempts {
            if self.cancel.is_cancelled() {
                return Err(SyncGuardError::Cancelled);
            }

            let state = if index == 1 {
                SyncState::PushAttempt
            } else {
                SyncState::RetryPush
            };
            debug!(branch = %target.branch, attempt = index, state = %state, "Pushing");

            match self.repo.push(&target.remote, &target.branch).await? {
                PushOutcome::Completed => {
                    debug!(branch = %target.branch, state = %SyncState::PushOk, "Push accepted");
                    attempts.push(Attempt {
                        index,
                        scheduled_delay,
                        outcome: AttemptOutcome::Success,
                    });
                    pushed = true;
                    break;
                }
                PushOutcome::Rejected { reason } => {
                    warn!(
                        branch = %target.branch,
                        attempt = index,
                        state = %SyncState::PushRejected,
                        reason = %reason,
                        "Push rejected by remote"
                    );

                    if !auto_resolve {
                        attempts.push(Attempt {
                            index,
                            scheduled_delay,
                            outcome: AttemptOutcome::FatalFailure(reason.clone()),
                        });
                        return Err(SyncGuardError::PushRejected(reason));
                    }

                    attempts.push(Attempt {
                        index,
                        scheduled_delay,
                        outcome: AttemptOutcome::TransientFailure(reason),
                    });

                    info!(
                        branch = %target.branch,
                        state = %SyncState::PullRebase,
                        "Rebasing onto updated remote"
                    );
                    match self.repo.pull_rebase(&target.remote, &target.branch).await? {
                        RebaseOutcome::Conflict { detail } => {
                            return Err(SyncGuardError::ConflictRequiringManualResolution(detail));
                        }
                        RebaseOutcome::Completed => {
                            if index < self.schedule.max_attempts {
                                scheduled_delay = self.schedule.delay(index);
                                debug!(
                                    branch = %target.branch,
                                    delay_ms = scheduled_delay.as_millis() as u64,
                                    "Backing off before retry push"
                                );
                                tokio::select! {
                                    _ = tokio::time::sleep(scheduled_delay) => {}
                                    _ = self.cancel.cancelled() => {
                                        return Err(SyncGuardError::Cancelled);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        if !pushed {
            return Err(RetryExhausted {
                operation: format!("push {}", target.branch),
                attempts,
                cancelled: false,
            }
            .into());
        }

        // Belt-and-suspenders: the push reported success, but a remote-side
        // rewrite or a concurrent pusher can still leave the remote
        // elsewhere. Equality of positions is the only acceptable outcome.
        debug!(branch = %target.branch, state = %SyncState::Verify, "Verifying remote position");
        self.repo.fetch(&target.remote, &target.branch).await?;
        let local = self.repo.local_position(&target.branch).await?;
        let remote = self
            .repo
            .remote_position(&target.remote, &target.branch)
            .await?;

        if local != remote {
            warn!(
                branch = %target.branch,
                local = %local,
                remote = %remote,
                state = %SyncState::VerifyFailed,
                "Remote diverged after push"
            );
            return Err(SyncGuardError::VerificationMismatch {
                branch: target.branch.clone(),
                local,
                remote,
            });
        }

        info!(
            branch = %target.branch,
            position = %local,
            state = %SyncState::Verified,
            "Sync push verified"
        );
        Ok(PushReport {
            final_position: local,
            committed,
            attempts,
        })
    }

    /// Fetch and compare positions; short-circuit when already up to date,
    /// otherwise pull with bounded retries.
    pub async fn sync_pull(&mut self, target: &SyncTarget) -> Result<PullReport> {
        self.repo.fetch(&target.remote, &target.branch).await?;

        let local = self.repo.local_position(&target.branch).await?;
        let remote = self
            .repo
            .remote_position(&target.remote, &target.branch)
            .await?;

        if local == remote {
            info!(branch = %target.branch, position = %local, "Already up to date");
            return Ok(PullReport {
                was_up_to_date: true,
            });
        }

        let executor = RetryExecutor::with_cancellation(self.cancel.clone());
        let operation = format!("pull {}", target.branch);
        executor
            .execute(&operation, &self.schedule, || {
                self.repo.pull(&target.remote, &target.branch)
            })
            .await?;

        info!(branch = %target.branch, "Pull complete");
        Ok(PullReport {
            was_up_to_date: false,
        })
    }
}
