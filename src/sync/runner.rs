use std::path::PathBuf;
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, SyncGuardError};

use super::remote::{PushOutcome, RebaseOutcome, RemoteRepository};

/// Stderr fragments git emits when a push is refused because the remote is
/// ahead. Anything else on a failed push is a hard error.
const REJECTION_MARKERS: &[&str] = &["[rejected]", "non-fast-forward", "fetch first"];

/// Output fragments that identify a rebase stopped on content conflicts.
const CONFLICT_MARKERS: &[&str] = &["CONFLICT", "could not apply", "Merge conflict"];

/// [`RemoteRepository`] over the `git` CLI, bound to one working tree.
pub struct GitCliRepository {
    working_dir: PathBuf,
}

impl GitCliRepository {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(args = ?args, dir = %self.working_dir.display(), "Running git command");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(args = ?args, stderr = %stderr, "Git command failed");
        }

        Ok(output)
    }

    async fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncGuardError::Git(stderr.trim().to_string()));
        }

        Ok(output)
    }

    fn combined_output(output: &Output) -> String {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        format!("{}\n{}", stdout.trim(), stderr.trim())
            .trim()
            .to_string()
    }
}

#[async_trait]
impl RemoteRepository for GitCliRepository {
    async fn has_local_changes(&self) -> Result<bool> {
        let output = self.run_checked(&["status", "--porcelain"]).await?;
        Ok(!output.stdout.is_empty())
    }

    async fn stage_and_commit(&self, message: &str) -> Result<bool> {
        self.run_checked(&["add", "-A"]).await?;

        let output = self.run(&["commit", "-m", message]).await?;
        if !output.status.success() {
            let combined = Self::combined_output(&output);
            if combined.contains("nothing to commit") {
                return Ok(false);
            }
            return Err(SyncGuardError::Git(combined));
        }

        Ok(true)
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<PushOutcome> {
        let output = self.run(&["push", remote, branch]).await?;
        if output.status.success() {
            return Ok(PushOutcome::Completed);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if REJECTION_MARKERS.iter().any(|m| stderr.contains(m)) {
            return Ok(PushOutcome::Rejected {
                reason: stderr.trim().to_string(),
            });
        }

        Err(SyncGuardError::Git(stderr.trim().to_string()))
    }

    async fn fetch(&self, remote: &str, branch: &str) -> Result<()> {
        self.run_checked(&["fetch", remote, branch]).await?;
        Ok(())
    }

    async fn local_position(&self, branch: &str) -> Result<String> {
        let output = self.run_checked(&["rev-parse", branch]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn remote_position(&self, remote: &str, branch: &str) -> Result<String> {
        let tracking = format!("{remote}/{branch}");
        let output = self.run_checked(&["rev-parse", &tracking]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn pull_rebase(&self, remote: &str, branch: &str) -> Result<RebaseOutcome> {
        let output = self.run(&["pull", "--rebase", remote, branch]).await?;
        if output.status.success() {
            return Ok(RebaseOutcome::Completed);
        }

        let combined = Self::combined_output(&output);
        if CONFLICT_MARKERS.iter().any(|m| combined.contains(m)) {
            // Leave the tree clean so the caller can resolve by hand.
            if let Err(e) = self.run_checked(&["rebase", "--abort"]).await {
                warn!(error = %e, "Failed to abort conflicted rebase");
            }
            return Ok(RebaseOutcome::Conflict { detail: combined });
        }

        Err(SyncGuardError::Git(combined))
    }

    async fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        self.run_checked(&["pull", remote, branch]).await?;
        Ok(())
    }
}
