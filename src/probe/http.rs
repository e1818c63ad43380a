use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{ProbeKind, ProbeSpec, Prober};

/// HTTP readiness prober: a GET that treats any error status (>= 400) as
/// unhealthy, like `curl -f`. Redirects and informational statuses pass.
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn attempt(&self, spec: &ProbeSpec) -> Result<(), String> {
        let ProbeKind::Http { url } = &spec.kind else {
            return Err(format!("http prober cannot handle {}", spec.target_label()));
        };

        let response = self
            .client
            .get(url)
            .timeout(spec.interval)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "HTTP probe response");

        if status.is_client_error() || status.is_server_error() {
            Err(format!("HTTP {status}"))
        } else {
            Ok(())
        }
    }
}
