use async_trait::async_trait;
use tokio::net::TcpStream;

use super::{ProbeKind, ProbeSpec, Prober};

/// TCP readiness prober: healthy iff a connect to `host:port` succeeds. The
/// connection is dropped immediately; only reachability is of interest.
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn attempt(&self, spec: &ProbeSpec) -> Result<(), String> {
        let ProbeKind::Tcp { addr } = &spec.kind else {
            return Err(format!("tcp prober cannot handle {}", spec.target_label()));
        };

        TcpStream::connect(addr.as_str())
            .await
            .map(drop)
            .map_err(|e| format!("connect to {addr} failed: {e}"))
    }
}
