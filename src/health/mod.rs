use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Result;
use crate::probe::{check, retry_probe, ProbeResult, ProbeSpec, ProberSet};

/// Per-probe breakdown plus the all-or-nothing verdict. `overall` is true
/// iff every probe came back healthy; the full result list is always
/// reported so callers can target remediation, not just read a boolean.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub results: Vec<ProbeResult>,
    pub passed: usize,
    pub failed: usize,
    pub overall: bool,
}

impl AggregateReport {
    fn from_results(results: Vec<ProbeResult>) -> Self {
        let passed = results.iter().filter(|r| r.healthy).count();
        let failed = results.len() - passed;
        Self {
            overall: failed == 0,
            passed,
            failed,
            results,
        }
    }

    pub fn summary(&self) -> String {
        if self.overall {
            format!("all {} probes healthy", self.results.len())
        } else {
            format!("{}/{} probes unhealthy", self.failed, self.results.len())
        }
    }

    /// Machine-consumable form for deployment tooling.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs a set of readiness probes and reduces them to one report. Probes are
/// independent and read-only, so they execute concurrently; results come
/// back in spec order regardless of completion order.
#[derive(Clone, Default)]
pub struct HealthCheckAggregator {
    probers: ProberSet,
    cancel: CancellationToken,
}

impl HealthCheckAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom probers, e.g. on hosts without a container runtime.
    pub fn with_probers(mut self, probers: ProberSet) -> Self {
        self.probers = probers;
        self
    }

    /// Abort in-flight probe polls promptly when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, specs: &[ProbeSpec]) -> AggregateReport {
        let checks = specs
            .iter()
            .map(|spec| check(self.probers.prober_for(spec), spec, &self.cancel));
        let report = AggregateReport::from_results(join_all(checks).await);

        info!(
            probes = report.results.len(),
            passed = report.passed,
            failed = report.failed,
            overall = report.overall,
            "Health checks complete"
        );
        report
    }

    /// Like [`run`](Self::run), but each probe that exhausts its own polling
    /// budget is re-run up to `retries` whole times with `delay` between
    /// runs.
    pub async fn run_with_retry(
        &self,
        specs: &[ProbeSpec],
        retries: u32,
        delay: Duration,
    ) -> AggregateReport {
        let checks = specs.iter().map(|spec| {
            retry_probe(
                self.probers.prober_for(spec),
                spec,
                retries,
                delay,
                &self.cancel,
            )
        });
        let report = AggregateReport::from_results(join_all(checks).await);

        info!(
            probes = report.results.len(),
            passed = report.passed,
            failed = report.failed,
            overall = report.overall,
            retries,
            "Health checks with retry complete"
        );
        report
    }
}
