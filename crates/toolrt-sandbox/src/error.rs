//! Sandbox-layer errors. Driver-specific kinds map into the shared
//! taxonomy at the runtime boundary (§7).

use toolrt_types::ErrorKind;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SandboxError {
    #[error("request lacked a tool gateway")]
    MissingGateway,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("daemon unavailable: {0}")]
    DaemonUnavailable(String),

    #[error("client not configured: {0}")]
    ClientNotConfigured(String),

    #[error("security violation: {0}")]
    SecurityViolation(String),

    #[error("sandbox violation: {0}")]
    SandboxViolation(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("{0}")]
    Remote(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("cancelled")]
    Cancelled,
}

impl SandboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SandboxError::MissingGateway => ErrorKind::MissingGateway,
            SandboxError::InvalidRequest(_) => ErrorKind::Configuration,
            SandboxError::DaemonUnavailable(_) => ErrorKind::DaemonUnavailable,
            SandboxError::ClientNotConfigured(_) => ErrorKind::ClientNotConfigured,
            SandboxError::SecurityViolation(_) => ErrorKind::SecurityViolation,
            SandboxError::SandboxViolation(_) => ErrorKind::SandboxViolation,
            SandboxError::BackendUnavailable(_) | SandboxError::Remote(_) => {
                ErrorKind::BackendUnavailable
            }
            SandboxError::LimitExceeded(_) => ErrorKind::LimitExceeded,
            SandboxError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }
}
