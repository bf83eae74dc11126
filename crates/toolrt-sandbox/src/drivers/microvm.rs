//! microVM driver (hardware virtualization). Same external-daemon shape as
//! [`crate::drivers::container`]: the actual hypervisor (Firecracker,
//! Cloud Hypervisor, ...) is not modeled here, only the contract a client
//! for one would need to satisfy.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SandboxError;
use crate::request::{ExecuteRequest, validate_request};
use crate::result::{BackendInfo, BackendKind, ExecuteResult, Readiness};

/// microVM-specific launch parameters validated before dispatch.
#[derive(Debug, Clone, Copy)]
pub struct VmShape {
    pub vcpu_count: u32,
    pub mem_mb: u32,
}

impl VmShape {
    fn validate(self) -> Result<(), SandboxError> {
        if self.vcpu_count == 0 {
            return Err(SandboxError::InvalidRequest("vcpuCount must be greater than zero".to_string()));
        }
        if self.mem_mb == 0 {
            return Err(SandboxError::InvalidRequest("memMB must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
pub trait MicroVmClient: Send + Sync {
    async fn run(
        &self,
        ctx: &CancellationToken,
        shape: VmShape,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError>;
}

pub struct MicroVmDriver {
    client: std::sync::Arc<dyn MicroVmClient>,
    kernel_image: String,
    rootfs_image: String,
    default_shape: VmShape,
}

impl MicroVmDriver {
    pub fn new(
        client: std::sync::Arc<dyn MicroVmClient>,
        kernel_image: impl Into<String>,
        rootfs_image: impl Into<String>,
        default_shape: VmShape,
    ) -> Self {
        Self {
            client,
            kernel_image: kernel_image.into(),
            rootfs_image: rootfs_image.into(),
            default_shape,
        }
    }

    fn shape_for(&self, req: &ExecuteRequest) -> VmShape {
        let vcpu_count = req
            .metadata
            .get("vcpuCount")
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.default_shape.vcpu_count);
        let mem_mb = req
            .metadata
            .get("memMB")
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.default_shape.mem_mb);
        VmShape { vcpu_count, mem_mb }
    }
}

#[async_trait]
impl crate::driver::IsolationBackend for MicroVmDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::MicroVm
    }

    async fn info(&self, _ctx: &CancellationToken) -> BackendInfo {
        BackendInfo {
            kind: BackendKind::MicroVm,
            readiness: Readiness::Ready,
            details: format!("kernel={} rootfs={}", self.kernel_image, self.rootfs_image),
        }
    }

    async fn execute(
        &self,
        ctx: &CancellationToken,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError> {
        validate_request(req)?;

        let shape = self.shape_for(req);
        shape.validate()?;

        self.client.run(ctx, shape, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::IsolationBackend;
    use crate::gateway::{DirectGateway, ToolGateway};
    use crate::profile::SecurityProfile;
    use std::sync::Arc;
    use toolrt_exec::{RegistryCatalog, Tools, ToolsLimits};
    use toolrt_runner::{Runner, ToolIndex};

    struct RecordingClient {
        seen: std::sync::Mutex<Option<VmShape>>,
    }

    #[async_trait]
    impl MicroVmClient for RecordingClient {
        async fn run(
            &self,
            _ctx: &CancellationToken,
            shape: VmShape,
            _req: &ExecuteRequest,
        ) -> Result<ExecuteResult, SandboxError> {
            *self.seen.lock().unwrap() = Some(shape);
            Ok(ExecuteResult {
                value: serde_json::Value::Null,
                stdout: String::new(),
                stderr: String::new(),
                duration: std::time::Duration::ZERO,
                backend: BackendInfo {
                    kind: BackendKind::MicroVm,
                    readiness: Readiness::Ready,
                    details: String::new(),
                },
                limits_enforced: Vec::new(),
                tool_calls: Vec::new(),
            })
        }
    }

    fn gateway() -> Arc<dyn ToolGateway> {
        let registry = Arc::new(toolrt_backends::Registry::new());
        let aggregator = Arc::new(toolrt_backends::Aggregator::new(Arc::clone(&registry)));
        let catalog = Arc::new(RegistryCatalog::new(Arc::clone(&registry), Arc::clone(&aggregator)));
        let index = Arc::new(ToolIndex::new(registry));
        let runner = Arc::new(Runner::new(index));
        let tools = Arc::new(Tools::new(catalog, runner, ToolsLimits::default()));
        Arc::new(DirectGateway::new(tools))
    }

    fn driver(client: Arc<RecordingClient>) -> MicroVmDriver {
        MicroVmDriver::new(
            client,
            "vmlinux",
            "rootfs.ext4",
            VmShape {
                vcpu_count: 2,
                mem_mb: 512,
            },
        )
    }

    #[tokio::test]
    async fn uses_default_shape_when_metadata_absent() {
        let client = Arc::new(RecordingClient {
            seen: std::sync::Mutex::new(None),
        });
        let d = driver(client.clone());
        let req = ExecuteRequest::new("print(1)", SecurityProfile::Hardened).with_gateway(gateway());
        d.execute(&CancellationToken::new(), &req).await.unwrap();
        let shape = client.seen.lock().unwrap().unwrap();
        assert_eq!(shape.vcpu_count, 2);
        assert_eq!(shape.mem_mb, 512);
    }

    #[tokio::test]
    async fn metadata_overrides_default_shape() {
        let client = Arc::new(RecordingClient {
            seen: std::sync::Mutex::new(None),
        });
        let d = driver(client.clone());
        let req = ExecuteRequest::new("print(1)", SecurityProfile::Hardened)
            .with_gateway(gateway())
            .with_metadata("vcpuCount", "4")
            .with_metadata("memMB", "1024");
        d.execute(&CancellationToken::new(), &req).await.unwrap();
        let shape = client.seen.lock().unwrap().unwrap();
        assert_eq!(shape.vcpu_count, 4);
        assert_eq!(shape.mem_mb, 1024);
    }

    #[tokio::test]
    async fn zero_vcpu_count_is_rejected() {
        let client = Arc::new(RecordingClient {
            seen: std::sync::Mutex::new(None),
        });
        let d = driver(client);
        let req = ExecuteRequest::new("print(1)", SecurityProfile::Hardened)
            .with_gateway(gateway())
            .with_metadata("vcpuCount", "0");
        let err = d.execute(&CancellationToken::new(), &req).await.unwrap_err();
        assert!(matches!(err, SandboxError::InvalidRequest(_)));
    }
}
