//! Errors raised inside the `Tools` environment and the code executor.

use toolrt_runner::RunnerError;
use toolrt_types::ErrorKind;

/// Where in a snippet an error was located, when locatable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeError {
    pub line: Option<u32>,
    pub col: Option<u32>,
    pub underlying: String,
}

impl CodeError {
    pub fn new(underlying: impl Into<String>) -> Self {
        Self {
            line: None,
            col: None,
            underlying: underlying.into(),
        }
    }

    pub fn at(line: u32, col: u32, underlying: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            col: Some(col),
            underlying: underlying.into(),
        }
    }
}

impl std::fmt::Display for CodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.col) {
            (Some(line), Some(col)) => write!(f, "{line}:{col}: {}", self.underlying),
            _ => write!(f, "{}", self.underlying),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecError {
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("code execution failed: {0}")]
    CodeExecution(CodeError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("cancelled")]
    Cancelled,
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::LimitExceeded(_) => ErrorKind::LimitExceeded,
            ExecError::CodeExecution(_) => ErrorKind::CodeExecution,
            ExecError::Runner(e) => e.kind(),
            ExecError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }
}
