//! WASM driver (engine-level isolation). Module bytes travel in request
//! metadata (base64); memory is capped in 64 KiB pages; host-function
//! access is gated by the security profile. The concrete WASM engine
//! (wasmtime, wasmer, ...) is modeled as a pluggable [`WasmEngineClient`]
//! rather than a hard dependency, mirroring the [`crate::drivers::container`]
//! split between driver contract and external runtime.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SandboxError;
use crate::profile::SecurityProfile;
use crate::request::{ExecuteRequest, validate_request};
use crate::result::{BackendInfo, BackendKind, ExecuteResult, Readiness};

const PAGE_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone)]
pub struct WasmLaunchOptions {
    pub module_bytes: Vec<u8>,
    pub max_pages: u64,
    pub host_functions_enabled: bool,
}

#[async_trait]
pub trait WasmEngineClient: Send + Sync {
    async fn run(
        &self,
        ctx: &CancellationToken,
        options: &WasmLaunchOptions,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError>;
}

pub struct WasmDriver {
    client: std::sync::Arc<dyn WasmEngineClient>,
}

impl WasmDriver {
    pub fn new(client: std::sync::Arc<dyn WasmEngineClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl crate::driver::IsolationBackend for WasmDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Wasm
    }

    async fn info(&self, _ctx: &CancellationToken) -> BackendInfo {
        BackendInfo {
            kind: BackendKind::Wasm,
            readiness: Readiness::Ready,
            details: "engine-level isolation".to_string(),
        }
    }

    async fn execute(
        &self,
        ctx: &CancellationToken,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError> {
        validate_request(req)?;

        let encoded = req
            .metadata
            .get("module_bytes")
            .ok_or_else(|| SandboxError::InvalidRequest("wasm driver requires module_bytes in metadata".to_string()))?;
        let module_bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
            .map_err(|e| SandboxError::InvalidRequest(format!("module_bytes is not valid base64: {e}")))?;

        let max_pages = if req.limits.memory_bytes == 0 {
            u64::MAX
        } else {
            req.limits.memory_bytes.div_ceil(PAGE_BYTES)
        };

        let host_functions_enabled = !matches!(req.profile, SecurityProfile::Hardened)
            && !req.profile.policy().host_functions_disabled;

        let options = WasmLaunchOptions {
            module_bytes,
            max_pages,
            host_functions_enabled,
        };

        self.client.run(ctx, &options, req).await
    }
}
