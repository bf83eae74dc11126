//! The pluggable language engine: consumes a snippet and the `Tools`
//! environment, returns the snippet's final value.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::CodeError;
use crate::executor::ExecuteParams;
use crate::tools::Tools;

/// The "final value" a snippet produced, by convention extracted from a
/// sentinel such as the snippet's `__out` variable, plus whatever the
/// snippet wrote to stdout/stderr while it ran.
#[derive(Debug, Clone, Default)]
pub struct EngineResult {
    pub value: Value,
    pub stdout: String,
    pub stderr: String,
}

/// A language-specific interpreter/driver. Implementations must honor
/// cancellation and must never panic on malformed input — a parse or run
/// failure that can be located is returned as a [`CodeError`].
#[async_trait]
pub trait Engine: Send + Sync {
    async fn run(
        &self,
        ctx: &CancellationToken,
        params: &ExecuteParams,
        tools: Arc<Tools>,
    ) -> Result<EngineResult, CodeError>;
}
