//! Backend-layer error type.

use toolrt_types::ErrorKind;

/// Errors a [`crate::backend::Backend`] implementation or the registry may
/// raise. Errors originating on a remote side are wrapped in
/// [`BackendError::Remote`] and passed through with their original message
/// rather than being re-worded.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("backend {0} is disabled")]
    Disabled(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend {0} already registered")]
    AlreadyRegistered(String),

    #[error("invalid tool id: {0}")]
    InvalidToolId(String),

    #[error("backend not found: {0}")]
    NotFound(String),

    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("{0}")]
    Remote(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cancelled")]
    Cancelled,

    #[error("streaming not supported by backend {0}")]
    StreamingNotSupported(String),
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Disabled(_) => ErrorKind::BackendDisabled,
            BackendError::ToolNotFound(_) => ErrorKind::ToolNotFound,
            BackendError::Unavailable(_)
            | BackendError::Remote(_)
            | BackendError::StreamingNotSupported(_) => ErrorKind::BackendUnavailable,
            BackendError::AlreadyRegistered(_) => ErrorKind::BackendExists,
            BackendError::InvalidToolId(_) => ErrorKind::InvalidToolId,
            BackendError::NotFound(_) => ErrorKind::BackendNotFound,
            BackendError::InvalidRegistration(_) | BackendError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            BackendError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }
}
