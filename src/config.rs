use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{Result, SyncGuardError};
use crate::retry::BackoffSchedule;

/// Environment override for the push/pull retry budget.
pub const MAX_RETRY_ATTEMPTS_ENV: &str = "MAX_RETRY_ATTEMPTS";
/// Environment override for the base retry delay, in seconds (a trailing `s`
/// is accepted, e.g. `INITIAL_RETRY_DELAY=5s`).
pub const INITIAL_RETRY_DELAY_ENV: &str = "INITIAL_RETRY_DELAY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub sync: SyncSettings,
    pub probe: ProbeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Maximum push/pull attempts per sync operation.
    pub max_retry_attempts: u32,
    /// Base delay between attempts, scaled by the attempt index.
    pub initial_retry_delay_secs: u64,
    /// Remote name pushes and fetches go through.
    pub remote: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            initial_retry_delay_secs: 2,
            remote: "origin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Total budget for an HTTP probe.
    pub http_timeout_secs: u64,
    /// Polling cadence for an HTTP probe.
    pub http_interval_secs: u64,
    /// Total budget for non-HTTP probes.
    pub timeout_secs: u64,
    /// Polling cadence for non-HTTP probes.
    pub interval_secs: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            http_timeout_secs: 60,
            http_interval_secs: 2,
            timeout_secs: 60,
            interval_secs: 2,
        }
    }
}

impl GuardConfig {
    /// Load from a TOML file if it exists, falling back to defaults, then
    /// apply environment overrides and validate.
    pub async fn load(path: &Path) -> Result<Self> {
        let mut config: Self = if fs::try_exists(path).await? {
            let content = fs::read_to_string(path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, no file involved.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(MAX_RETRY_ATTEMPTS_ENV) {
            self.sync.max_retry_attempts = raw.trim().parse().map_err(|_| {
                SyncGuardError::Config(format!(
                    "{MAX_RETRY_ATTEMPTS_ENV} must be a positive integer, got '{raw}'"
                ))
            })?;
        }
        if let Ok(raw) = std::env::var(INITIAL_RETRY_DELAY_ENV) {
            let trimmed = raw.trim().trim_end_matches(['s', 'S']);
            self.sync.initial_retry_delay_secs = trimmed.parse().map_err(|_| {
                SyncGuardError::Config(format!(
                    "{INITIAL_RETRY_DELAY_ENV} must be a number of seconds, got '{raw}'"
                ))
            })?;
        }
        Ok(())
    }

    /// Validate configuration values for consistency. Collects every
    /// violation rather than stopping at the first.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.sync.max_retry_attempts == 0 {
            errors.push("sync.max_retry_attempts must be at least 1");
        }
        if self.sync.remote.is_empty() {
            errors.push("sync.remote must not be empty");
        }
        if self.probe.http_timeout_secs == 0 {
            errors.push("probe.http_timeout_secs must be greater than 0");
        }
        if self.probe.http_interval_secs == 0 {
            errors.push("probe.http_interval_secs must be greater than 0");
        }
        if self.probe.timeout_secs == 0 {
            errors.push("probe.timeout_secs must be greater than 0");
        }
        if self.probe.interval_secs == 0 {
            errors.push("probe.interval_secs must be greater than 0");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SyncGuardError::Config(errors.join("; ")))
        }
    }

    /// The schedule sync operations retry under.
    pub fn push_schedule(&self) -> Result<BackoffSchedule> {
        BackoffSchedule::exponential(
            self.sync.max_retry_attempts,
            Duration::from_secs(self.sync.initial_retry_delay_secs),
        )
    }

    pub fn http_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.http_timeout_secs)
    }

    pub fn http_probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe.http_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe.interval_secs)
    }
}
