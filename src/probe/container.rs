use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{ProbeKind, ProbeSpec, Prober};

/// Container readiness prober: runs a check command inside a named container
/// via the container runtime CLI; healthy iff the command exits zero.
///
/// The spawned process is killed on drop, so a check that outlives the poll
/// loop's per-attempt cap is reaped rather than leaked.
pub struct ContainerProber {
    runtime: String,
}

impl ContainerProber {
    pub fn new() -> Self {
        Self::with_runtime("docker")
    }

    /// Use an alternative runtime CLI, e.g. `podman`.
    pub fn with_runtime(runtime: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
        }
    }
}

impl Default for ContainerProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for ContainerProber {
    async fn attempt(&self, spec: &ProbeSpec) -> Result<(), String> {
        let ProbeKind::ContainerExec { container, command } = &spec.kind else {
            return Err(format!(
                "container prober cannot handle {}",
                spec.target_label()
            ));
        };
        if command.is_empty() {
            return Err(format!("no check command configured for {container}"));
        }

        debug!(container = %container, command = ?command, "Running container check");

        let output = Command::new(&self.runtime)
            .arg("exec")
            .arg(container)
            .args(command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to run {} exec: {e}", self.runtime))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!(
                "check command exited with {} in {container}: {}",
                output.status,
                stderr.trim()
            ))
        }
    }
}
