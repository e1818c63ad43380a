use async_trait::async_trait;

use super::{ProbeKind, ProbeSpec, Prober};

/// Process liveness prober: sends signal 0, which performs the permission and
/// existence checks without delivering anything. ESRCH means the process is
/// gone; EPERM means it exists but belongs to someone else, which still
/// counts as alive.
pub struct ProcessProber;

#[async_trait]
impl Prober for ProcessProber {
    async fn attempt(&self, spec: &ProbeSpec) -> Result<(), String> {
        let ProbeKind::Process { pid } = &spec.kind else {
            return Err(format!(
                "process prober cannot handle {}",
                spec.target_label()
            ));
        };

        let pid = *pid as libc::pid_t;
        let ret = unsafe { libc::kill(pid, 0) };
        if ret == 0 {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EPERM) => Ok(()),
            Some(libc::ESRCH) => Err(format!("no such process: {pid}")),
            _ => Err(format!("liveness query for {pid} failed: {err}")),
        }
    }
}
