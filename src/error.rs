use thiserror::Error;

use crate::retry::RetryExhausted;

#[derive(Error, Debug)]
pub enum SyncGuardError {
    #[error("push rejected by remote: {0}")]
    PushRejected(String),

    #[error("rebase stopped on conflicts, manual resolution required: {0}")]
    ConflictRequiringManualResolution(String),

    #[error(transparent)]
    RetryExhausted(#[from] RetryExhausted),

    #[error("verification mismatch on '{branch}': local is at {local}, remote is at {remote}")]
    VerificationMismatch {
        branch: String,
        local: String,
        remote: String,
    },

    #[error("git error: {0}")]
    Git(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid probe spec: {0}")]
    Probe(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncGuardError {
    /// A transient failure may succeed on a later attempt; everything else is
    /// fatal to the calling operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::PushRejected(_) | Self::Io(_))
    }

    pub fn is_fatal(&self) -> bool {
        !self.is_transient()
    }
}

pub type Result<T> = std::result::Result<T, SyncGuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error() -> SyncGuardError {
        std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset").into()
    }

    #[test]
    fn rejections_and_io_failures_are_transient() {
        let rejected = SyncGuardError::PushRejected("non-fast-forward".to_string());

        assert!(rejected.is_transient());
        assert!(!rejected.is_fatal());
        assert!(io_error().is_transient());
    }

    #[test]
    fn conflicts_mismatches_and_cancellation_are_fatal() {
        let conflict =
            SyncGuardError::ConflictRequiringManualResolution("CONFLICT (content)".to_string());
        let mismatch = SyncGuardError::VerificationMismatch {
            branch: "main".to_string(),
            local: "abc123".to_string(),
            remote: "fff999".to_string(),
        };

        assert!(conflict.is_fatal());
        assert!(!conflict.is_transient());
        assert!(mismatch.is_fatal());
        assert!(SyncGuardError::Cancelled.is_fatal());
        assert!(SyncGuardError::Config("bad value".to_string()).is_fatal());
    }
}
