//! Exercises `GitCliRepository` against real repositories: a bare origin and
//! two clones that are made to diverge, so rejection and conflict
//! classification run against actual git output rather than scripted
//! outcomes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::Command;

use syncguard::{
    BackoffSchedule, GitCliRepository, PushOutcome, RebaseOutcome, RemoteRepository,
    RemoteSyncCoordinator, SyncTarget,
};

async fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

async fn write(dir: &Path, file: &str, content: &str) {
    tokio::fs::write(dir.join(file), content).await.unwrap();
}

async fn commit_all(dir: &Path, message: &str) {
    git(dir, &["add", "-A"]).await;
    git(dir, &["commit", "-m", message]).await;
}

/// A bare origin with two clones sharing one base commit.
struct Fixture {
    _root: TempDir,
    a: PathBuf,
    b: PathBuf,
}

impl Fixture {
    async fn new() -> Self {
        let root = TempDir::new().unwrap();
        let origin = root.path().join("origin.git");
        tokio::fs::create_dir(&origin).await.unwrap();
        git(&origin, &["init", "--bare"]).await;

        let a = root.path().join("a");
        let b = root.path().join("b");
        for clone in [&a, &b] {
            git(
                root.path(),
                &["clone", origin.to_str().unwrap(), clone.to_str().unwrap()],
            )
            .await;
            git(clone, &["symbolic-ref", "HEAD", "refs/heads/main"]).await;
            git(clone, &["config", "user.email", "ci@example.com"]).await;
            git(clone, &["config", "user.name", "ci"]).await;
        }

        write(&a, "base.txt", "base\n").await;
        commit_all(&a, "base").await;
        git(&a, &["push", "origin", "main"]).await;
        git(&b, &["pull", "origin", "main"]).await;

        Self { _root: root, a, b }
    }

    /// Commit `file_a` in clone a and push it, then commit `file_b` in clone
    /// b without fetching, leaving b behind the remote.
    async fn diverge(&self, file_a: &str, file_b: &str) {
        write(&self.a, file_a, "from a\n").await;
        commit_all(&self.a, "change in a").await;
        git(&self.a, &["push", "origin", "main"]).await;

        write(&self.b, file_b, "from b\n").await;
        commit_all(&self.b, "change in b").await;
    }
}

#[tokio::test]
async fn clean_tree_commit_is_a_no_op() {
    let fx = Fixture::new().await;
    let repo = GitCliRepository::new(&fx.a);

    assert!(!repo.has_local_changes().await.unwrap());
    assert!(!repo.stage_and_commit("nothing here").await.unwrap());
}

#[tokio::test]
async fn dirty_tree_commit_creates_a_commit() {
    let fx = Fixture::new().await;
    let repo = GitCliRepository::new(&fx.a);
    let before = repo.local_position("main").await.unwrap();

    write(&fx.a, "new.txt", "fresh\n").await;
    assert!(repo.has_local_changes().await.unwrap());
    assert!(repo.stage_and_commit("add new.txt").await.unwrap());

    assert!(!repo.has_local_changes().await.unwrap());
    assert_ne!(repo.local_position("main").await.unwrap(), before);
}

#[tokio::test]
async fn diverged_push_is_classified_as_rejected() {
    let fx = Fixture::new().await;
    fx.diverge("a.txt", "b.txt").await;
    let repo = GitCliRepository::new(&fx.b);

    let outcome = repo.push("origin", "main").await.unwrap();

    assert!(
        matches!(outcome, PushOutcome::Rejected { .. }),
        "expected rejection, got {outcome:?}"
    );
}

#[tokio::test]
async fn rejected_push_recovers_after_rebase() {
    let fx = Fixture::new().await;
    fx.diverge("a.txt", "b.txt").await;
    let repo = GitCliRepository::new(&fx.b);

    assert!(matches!(
        repo.push("origin", "main").await.unwrap(),
        PushOutcome::Rejected { .. }
    ));
    assert_eq!(
        repo.pull_rebase("origin", "main").await.unwrap(),
        RebaseOutcome::Completed
    );
    assert_eq!(
        repo.push("origin", "main").await.unwrap(),
        PushOutcome::Completed
    );

    repo.fetch("origin", "main").await.unwrap();
    let local = repo.local_position("main").await.unwrap();
    let remote = repo.remote_position("origin", "main").await.unwrap();
    assert_eq!(local, remote);
}

#[tokio::test]
async fn conflicting_rebase_reports_conflict_and_leaves_the_tree_clean() {
    let fx = Fixture::new().await;
    // Same file on both sides forces a content conflict during the rebase.
    fx.diverge("conflict.txt", "conflict.txt").await;
    let repo = GitCliRepository::new(&fx.b);

    assert!(matches!(
        repo.push("origin", "main").await.unwrap(),
        PushOutcome::Rejected { .. }
    ));

    let outcome = repo.pull_rebase("origin", "main").await.unwrap();
    let RebaseOutcome::Conflict { detail } = outcome else {
        panic!("expected conflict, got {outcome:?}");
    };
    assert!(
        detail.contains("CONFLICT") || detail.contains("could not apply"),
        "detail: {detail}"
    );

    // The abort must leave no rebase in progress and no dirty files.
    assert!(!fx.b.join(".git/rebase-merge").exists());
    assert!(!fx.b.join(".git/rebase-apply").exists());
    assert!(!repo.has_local_changes().await.unwrap());
}

#[tokio::test]
async fn coordinator_auto_resolves_a_real_divergence() {
    let fx = Fixture::new().await;
    fx.diverge("a.txt", "b.txt").await;
    let schedule = BackoffSchedule::exponential(3, Duration::ZERO).unwrap();
    let mut coordinator = RemoteSyncCoordinator::new(GitCliRepository::new(&fx.b), schedule);

    let report = coordinator
        .sync_push(&SyncTarget::new("main"), true)
        .await
        .unwrap();

    assert_eq!(report.attempts.len(), 2);
    let verified = coordinator
        .repository()
        .remote_position("origin", "main")
        .await
        .unwrap();
    assert_eq!(report.final_position, verified);
}

#[tokio::test]
async fn pull_round_trip_against_a_real_remote() {
    let fx = Fixture::new().await;
    write(&fx.a, "update.txt", "v2\n").await;
    commit_all(&fx.a, "update").await;
    git(&fx.a, &["push", "origin", "main"]).await;

    let schedule = BackoffSchedule::exponential(3, Duration::ZERO).unwrap();
    let mut coordinator = RemoteSyncCoordinator::new(GitCliRepository::new(&fx.b), schedule);

    let first = coordinator.sync_pull(&SyncTarget::new("main")).await.unwrap();
    let second = coordinator.sync_pull(&SyncTarget::new("main")).await.unwrap();

    assert!(!first.was_up_to_date);
    assert!(second.was_up_to_date);
}
