//! The `IsolationBackend` seam every driver under [`crate::drivers`]
//! implements, and the `Runtime` dispatches through (§4.8).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SandboxError;
use crate::request::ExecuteRequest;
use crate::result::{BackendInfo, BackendKind, ExecuteResult};

#[async_trait]
pub trait IsolationBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Cheap readiness probe, independent of any particular request.
    async fn info(&self, ctx: &CancellationToken) -> BackendInfo;

    async fn execute(
        &self,
        ctx: &CancellationToken,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError>;
}
