//! The shared error-kind taxonomy.
//!
//! Every crate in the workspace defines its own `thiserror` error enum for
//! its own concerns, but every variant maps to one of these kinds so callers
//! can match on `kind()` rather than on message text, the way
//! `ToolExecutionError::tool_name()` exposes a typed accessor instead of
//! requiring string inspection.

use std::fmt;

/// Kind taxonomy shared across the whole substrate (registry, runner,
/// executor, sandbox runtime, and drivers all raise errors tagged with one
/// of these).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidToolId,
    BackendNotFound,
    BackendDisabled,
    BackendUnavailable,
    ToolNotFound,
    BackendExists,
    Configuration,
    LimitExceeded,
    CodeExecution,
    MissingGateway,
    SandboxViolation,
    DaemonUnavailable,
    ClientNotConfigured,
    SecurityViolation,
    /// Not part of the named taxonomy table but pervasive: every operation
    /// must check its cancellation token first and return promptly.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidToolId => "invalid_tool_id",
            ErrorKind::BackendNotFound => "backend_not_found",
            ErrorKind::BackendDisabled => "backend_disabled",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::ToolNotFound => "tool_not_found",
            ErrorKind::BackendExists => "backend_exists",
            ErrorKind::Configuration => "configuration",
            ErrorKind::LimitExceeded => "limit_exceeded",
            ErrorKind::CodeExecution => "code_execution",
            ErrorKind::MissingGateway => "missing_gateway",
            ErrorKind::SandboxViolation => "sandbox_violation",
            ErrorKind::DaemonUnavailable => "daemon_unavailable",
            ErrorKind::ClientNotConfigured => "client_not_configured",
            ErrorKind::SecurityViolation => "security_violation",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A generic taxonomy-tagged error, used directly by `toolrt-types` itself
/// (ID parsing, deep-copy) and as the `#[from]` target further up the stack.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TaxonomyError {
    kind: ErrorKind,
    message: String,
}

impl TaxonomyError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}
