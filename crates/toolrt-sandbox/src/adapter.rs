//! The production [`Engine`] adapter (§4.5.6): runs a snippet by handing
//! it to the [`Runtime`], wrapping the host-side [`Tools`] in a
//! [`DirectGateway`] so the sandbox can call back into it. From the
//! snippet's perspective `run_tool` looks identical whether the call stays
//! in-process or crosses into a container/microVM/WASM/remote driver.
//!
//! This mirrors a familiar adapter shape: one trait object wraps another so
//! a caller on one interface never has to know which concrete
//! implementation backs the interface it delegates to.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use toolrt_exec::{CodeError, Engine, EngineResult, ExecuteParams, Tools};

use crate::gateway::DirectGateway;
use crate::profile::SecurityProfile;
use crate::request::ExecuteRequest;
use crate::runtime::Runtime;

/// Adapts [`toolrt_exec::Executor`]'s pluggable [`Engine`] seam to dispatch
/// through the sandbox [`Runtime`] instead of interpreting the snippet
/// in-process.
pub struct SandboxEngine {
    runtime: Arc<Runtime>,
    profile: SecurityProfile,
}

impl SandboxEngine {
    pub fn new(runtime: Arc<Runtime>, profile: SecurityProfile) -> Self {
        Self { runtime, profile }
    }
}

#[async_trait]
impl Engine for SandboxEngine {
    async fn run(
        &self,
        ctx: &CancellationToken,
        params: &ExecuteParams,
        tools: Arc<Tools>,
    ) -> Result<EngineResult, CodeError> {
        let gateway = Arc::new(DirectGateway::new(tools));

        let mut req = ExecuteRequest::new(params.code.clone(), self.profile)
            .with_gateway(gateway)
            .with_timeout(params.timeout);
        req.language = params.language.clone();

        match self.runtime.execute(ctx, &req).await {
            Ok(result) => Ok(EngineResult {
                value: result.value,
                stdout: result.stdout,
                stderr: result.stderr,
            }),
            Err(err) if err.is_kind(toolrt_types::ErrorKind::LimitExceeded) => {
                Err(CodeError::new(format!("sandbox limit exceeded: {err}")))
            }
            Err(err) if err.is_kind(toolrt_types::ErrorKind::SandboxViolation) => {
                Err(CodeError::new(format!("sandbox violation: {err}")))
            }
            Err(err) => Err(CodeError::new(err.to_string())),
        }
    }
}
