mod container;
mod http;
mod process;
mod tcp;

pub use container::ContainerProber;
pub use http::HttpProber;
pub use process::ProcessProber;
pub use tcp::TcpProber;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, SyncGuardError};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(2);

/// What to probe and how. The timeout is the *total* budget for the check;
/// the interval is the polling cadence, so `timeout / interval` bounds the
/// number of attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSpec {
    #[serde(flatten)]
    pub kind: ProbeKind,
    pub timeout: Duration,
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeKind {
    /// Bounded-timeout GET; any HTTP error status (>= 400) is unhealthy.
    Http { url: String },
    /// Raw connect to `host:port`.
    Tcp { addr: String },
    /// Signal-0 liveness query against a PID.
    Process { pid: u32 },
    /// A check command executed inside a named container; healthy iff it
    /// exits zero.
    ContainerExec {
        container: String,
        command: Vec<String>,
    },
}

impl ProbeSpec {
    pub fn http(url: impl Into<String>) -> Self {
        Self::with_kind(ProbeKind::Http { url: url.into() })
    }

    pub fn tcp(addr: impl Into<String>) -> Self {
        Self::with_kind(ProbeKind::Tcp { addr: addr.into() })
    }

    pub fn process(pid: u32) -> Self {
        Self::with_kind(ProbeKind::Process { pid })
    }

    pub fn container_exec(container: impl Into<String>, command: Vec<String>) -> Self {
        Self::with_kind(ProbeKind::ContainerExec {
            container: container.into(),
            command,
        })
    }

    fn with_kind(kind: ProbeKind) -> Self {
        Self {
            kind,
            timeout: DEFAULT_PROBE_TIMEOUT,
            interval: DEFAULT_PROBE_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(SyncGuardError::Probe(format!(
                "timeout must be greater than zero for {}",
                self.target_label()
            )));
        }
        if self.interval.is_zero() {
            return Err(SyncGuardError::Probe(format!(
                "interval must be greater than zero for {}",
                self.target_label()
            )));
        }
        Ok(())
    }

    /// Number of attempts the timeout budget allows at this interval.
    pub fn attempt_budget(&self) -> u32 {
        (self.timeout.as_millis() / self.interval.as_millis().max(1)) as u32
    }

    /// Short human-readable identity of the target, for logs and reports.
    pub fn target_label(&self) -> String {
        match &self.kind {
            ProbeKind::Http { url } => format!("http {url}"),
            ProbeKind::Tcp { addr } => format!("tcp {addr}"),
            ProbeKind::Process { pid } => format!("process {pid}"),
            ProbeKind::ContainerExec { container, .. } => format!("container {container}"),
        }
    }
}

/// Outcome of one whole probe invocation. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub spec: ProbeSpec,
    pub healthy: bool,
    pub elapsed: Duration,
    pub detail: String,
}

impl ProbeResult {
    fn new(spec: &ProbeSpec, healthy: bool, elapsed: Duration, detail: impl Into<String>) -> Self {
        Self {
            spec: spec.clone(),
            healthy,
            elapsed,
            detail: detail.into(),
        }
    }
}

/// One bounded attempt against a target. Implementations must return promptly
/// on failure; the poll loop additionally enforces the spec interval as a
/// hard per-attempt cap, so a hung attempt cannot run the budget over.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn attempt(&self, spec: &ProbeSpec) -> std::result::Result<(), String>;
}

/// Run one probe to completion: poll every `interval` until the target is
/// healthy or the `timeout` budget is exhausted. Always returns a result,
/// never an unbounded wait.
pub async fn check(prober: &dyn Prober, spec: &ProbeSpec, cancel: &CancellationToken) -> ProbeResult {
    let start = Instant::now();

    if let Err(e) = spec.validate() {
        return ProbeResult::new(spec, false, start.elapsed(), e.to_string());
    }

    let budget = spec.attempt_budget();
    let mut last_detail = String::from("no attempts made (timeout is shorter than interval)");

    for attempt in 1..=budget {
        if cancel.is_cancelled() {
            return ProbeResult::new(spec, false, start.elapsed(), "cancelled");
        }

        let outcome = tokio::select! {
            res = timeout(spec.interval, prober.attempt(spec)) => res,
            _ = cancel.cancelled() => {
                return ProbeResult::new(spec, false, start.elapsed(), "cancelled");
            }
        };

        match outcome {
            Ok(Ok(())) => {
                debug!(target = %spec.target_label(), attempt, "Probe healthy");
                return ProbeResult::new(spec, true, start.elapsed(), "healthy");
            }
            Ok(Err(detail)) => {
                debug!(
                    target = %spec.target_label(),
                    attempt,
                    budget,
                    detail = %detail,
                    "Probe attempt failed"
                );
                last_detail = detail;
            }
            Err(_) => {
                debug!(
                    target = %spec.target_label(),
                    attempt,
                    budget,
                    "Probe attempt exceeded interval"
                );
                last_detail = format!(
                    "attempt did not complete within the {}s interval",
                    spec.interval.as_secs()
                );
            }
        }

        if attempt < budget {
            let next_tick = start + spec.interval * attempt;
            tokio::select! {
                _ = sleep_until(next_tick) => {}
                _ = cancel.cancelled() => {
                    return ProbeResult::new(spec, false, start.elapsed(), "cancelled");
                }
            }
        }
    }

    let elapsed = start.elapsed();
    warn!(
        target = %spec.target_label(),
        elapsed_secs = elapsed.as_secs(),
        attempts = budget,
        "Probe timed out"
    );
    ProbeResult::new(
        spec,
        false,
        elapsed,
        format!("timed out after {}s: {}", elapsed.as_secs(), last_detail),
    )
}

/// Retry a whole probe. This is a second retry layer on top of the probe's
/// own internal polling: a probe that already timed out is re-run up to
/// `retries` more times with `delay` between whole runs, to tolerate services
/// that restart mid-check. Elapsed time accumulates across runs.
pub async fn retry_probe(
    prober: &dyn Prober,
    spec: &ProbeSpec,
    retries: u32,
    delay: Duration,
    cancel: &CancellationToken,
) -> ProbeResult {
    let start = Instant::now();
    let mut result = check(prober, spec, cancel).await;
    let mut reruns = 0u32;

    while !result.healthy && reruns < retries && !cancel.is_cancelled() {
        reruns += 1;
        warn!(
            target = %spec.target_label(),
            rerun = reruns,
            retries,
            detail = %result.detail,
            "Probe failed, retrying whole check"
        );
        tokio::select! {
            _ = sleep(delay) => {}
            _ = cancel.cancelled() => break,
        }
        result = check(prober, spec, cancel).await;
    }

    result.elapsed = start.elapsed();
    if !result.healthy && reruns > 0 {
        result.detail = format!("{} ({} whole retries)", result.detail, reruns);
    }
    result
}

/// Kind-to-prober wiring. The default set covers all four strategies;
/// environments without a container runtime (or any other capability) can
/// swap in their own implementations per kind.
#[derive(Clone)]
pub struct ProberSet {
    http: Arc<dyn Prober>,
    tcp: Arc<dyn Prober>,
    process: Arc<dyn Prober>,
    container: Arc<dyn Prober>,
}

impl Default for ProberSet {
    fn default() -> Self {
        Self {
            http: Arc::new(HttpProber::new()),
            tcp: Arc::new(TcpProber),
            process: Arc::new(ProcessProber),
            container: Arc::new(ContainerProber::new()),
        }
    }
}

impl ProberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http(mut self, prober: Arc<dyn Prober>) -> Self {
        self.http = prober;
        self
    }

    pub fn with_tcp(mut self, prober: Arc<dyn Prober>) -> Self {
        self.tcp = prober;
        self
    }

    pub fn with_process(mut self, prober: Arc<dyn Prober>) -> Self {
        self.process = prober;
        self
    }

    pub fn with_container(mut self, prober: Arc<dyn Prober>) -> Self {
        self.container = prober;
        self
    }

    pub fn prober_for(&self, spec: &ProbeSpec) -> &dyn Prober {
        match &spec.kind {
            ProbeKind::Http { .. } => self.http.as_ref(),
            ProbeKind::Tcp { .. } => self.tcp.as_ref(),
            ProbeKind::Process { .. } => self.process.as_ref(),
            ProbeKind::ContainerExec { .. } => self.container.as_ref(),
        }
    }
}
