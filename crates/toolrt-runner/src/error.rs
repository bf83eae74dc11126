//! Runner-layer error type.

use toolrt_backends::BackendError;
use toolrt_types::ErrorKind;

/// An error surfaced by [`crate::Runner`]. Wraps the step/operation it
/// occurred at so a chain's trace can say which stage failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunnerError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("backend not found for tool: {0}")]
    BackendNotFound(String),

    #[error("{op}: {source}")]
    Validation { op: String, source: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("cancelled")]
    Cancelled,
}

impl RunnerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunnerError::ToolNotFound(_) => ErrorKind::ToolNotFound,
            RunnerError::BackendNotFound(_) => ErrorKind::BackendNotFound,
            RunnerError::Validation { .. } => ErrorKind::Configuration,
            RunnerError::Backend(e) => e.kind(),
            RunnerError::LimitExceeded(_) => ErrorKind::LimitExceeded,
            RunnerError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// The backend kind that produced this error, when recoverable — used
    /// when constructing a tool-call trace record for a failed run.
    pub fn backend_kind_hint(&self) -> Option<&str> {
        None
    }
}
