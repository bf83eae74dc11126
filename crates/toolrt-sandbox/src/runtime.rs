//! `Runtime` — the profile-dispatching facade over isolation backends
//! (§4.6). Binds a [`SecurityProfile`] to a concrete [`IsolationBackend`]
//! at construction, applies the behaviors assigned to the runtime layer
//! rather than to each driver (request validation, default-profile
//! fallback, value-extraction backstop), and dispatches.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::driver::IsolationBackend;
use crate::error::SandboxError;
use crate::extraction::extract_value;
use crate::profile::SecurityProfile;
use crate::request::{ExecuteRequest, validate_request};
use crate::result::ExecuteResult;

/// Binds each [`SecurityProfile`] to the driver that serves it. Profiles
/// with no explicit entry fall back to `default_profile`'s driver.
pub struct Runtime {
    backends: HashMap<SecurityProfile, Arc<dyn IsolationBackend>>,
    default_profile: SecurityProfile,
}

pub struct RuntimeBuilder {
    backends: HashMap<SecurityProfile, Arc<dyn IsolationBackend>>,
    default_profile: SecurityProfile,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_profile: SecurityProfile::Standard,
        }
    }

    pub fn with_backend(mut self, profile: SecurityProfile, backend: Arc<dyn IsolationBackend>) -> Self {
        self.backends.insert(profile, backend);
        self
    }

    pub fn with_default_profile(mut self, profile: SecurityProfile) -> Self {
        self.default_profile = profile;
        self
    }

    pub fn build(self) -> Result<Runtime, SandboxError> {
        if self.backends.is_empty() {
            return Err(SandboxError::InvalidRequest(
                "runtime requires at least one profile-to-backend binding".to_string(),
            ));
        }
        Ok(Runtime {
            backends: self.backends,
            default_profile: self.default_profile,
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    fn backend_for(&self, profile: SecurityProfile) -> Result<&Arc<dyn IsolationBackend>, SandboxError> {
        if let Some(backend) = self.backends.get(&profile) {
            return Ok(backend);
        }
        self.backends.get(&self.default_profile).ok_or_else(|| {
            SandboxError::InvalidRequest(format!(
                "no backend bound for profile {profile} and no default-profile backend configured"
            ))
        })
    }

    #[instrument(skip(self, ctx, req), fields(profile = %req.profile))]
    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError> {
        validate_request(req)?;

        if ctx.is_cancelled() {
            return Err(SandboxError::Cancelled);
        }

        let backend = self.backend_for(req.profile)?;
        let mut result = backend.execute(ctx, req).await?;

        // The __out convention is read-only extraction over stdout; a
        // driver that already populated `value` (e.g. because its wire
        // protocol carries a structured result directly) is left alone.
        if result.value.is_null() {
            result.value = extract_value(&result.stdout);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{BackendInfo, BackendKind, Readiness};
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubBackend {
        kind: BackendKind,
        stdout: String,
    }

    #[async_trait]
    impl IsolationBackend for StubBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn info(&self, _ctx: &CancellationToken) -> BackendInfo {
            BackendInfo {
                kind: self.kind,
                readiness: Readiness::Ready,
                details: String::new(),
            }
        }

        async fn execute(
            &self,
            _ctx: &CancellationToken,
            _req: &ExecuteRequest,
        ) -> Result<ExecuteResult, SandboxError> {
            Ok(ExecuteResult {
                value: serde_json::Value::Null,
                stdout: self.stdout.clone(),
                stderr: String::new(),
                duration: Duration::ZERO,
                backend: BackendInfo {
                    kind: self.kind,
                    readiness: Readiness::Ready,
                    details: String::new(),
                },
                limits_enforced: Vec::new(),
                tool_calls: Vec::new(),
            })
        }
    }

    fn gateway_stub() -> Arc<dyn crate::gateway::ToolGateway> {
        struct NullGateway;
        #[async_trait]
        impl crate::gateway::ToolGateway for NullGateway {
            async fn search_tools(
                &self,
                _ctx: &CancellationToken,
                _query: &str,
                _limit: usize,
            ) -> Result<Vec<toolrt_types::Tool>, SandboxError> {
                Ok(Vec::new())
            }
            async fn list_namespaces(&self, _ctx: &CancellationToken) -> Result<Vec<String>, SandboxError> {
                Ok(Vec::new())
            }
            async fn describe_tool(
                &self,
                _ctx: &CancellationToken,
                _full_tool_id: &str,
                _detail: toolrt_exec::DetailLevel,
            ) -> Result<Option<String>, SandboxError> {
                Ok(None)
            }
            async fn list_tool_examples(
                &self,
                _ctx: &CancellationToken,
                _full_tool_id: &str,
                _max: usize,
            ) -> Result<Vec<String>, SandboxError> {
                Ok(Vec::new())
            }
            async fn run_tool(
                &self,
                _ctx: &CancellationToken,
                _id: &toolrt_types::ToolId,
                _args: HashMap<String, serde_json::Value>,
            ) -> Result<serde_json::Value, SandboxError> {
                Ok(serde_json::Value::Null)
            }
            async fn run_chain(
                &self,
                _ctx: &CancellationToken,
                _steps: Vec<toolrt_runner::RunStep>,
            ) -> Result<serde_json::Value, SandboxError> {
                Ok(serde_json::Value::Null)
            }
        }
        Arc::new(NullGateway)
    }

    #[tokio::test]
    async fn dispatches_to_the_bound_backend_for_a_profile() {
        let runtime = Runtime::builder()
            .with_backend(
                SecurityProfile::Hardened,
                Arc::new(StubBackend {
                    kind: BackendKind::Wasm,
                    stdout: String::new(),
                }),
            )
            .with_default_profile(SecurityProfile::Hardened)
            .build()
            .unwrap();

        let req = ExecuteRequest::new("1+1", SecurityProfile::Hardened).with_gateway(gateway_stub());
        let result = runtime.execute(&CancellationToken::new(), &req).await.unwrap();
        assert_eq!(result.backend.kind, BackendKind::Wasm);
    }

    #[tokio::test]
    async fn unmapped_profile_falls_back_to_default() {
        let runtime = Runtime::builder()
            .with_backend(
                SecurityProfile::Dev,
                Arc::new(StubBackend {
                    kind: BackendKind::UnsafeHost,
                    stdout: String::new(),
                }),
            )
            .with_default_profile(SecurityProfile::Dev)
            .build()
            .unwrap();

        let req = ExecuteRequest::new("1+1", SecurityProfile::Hardened).with_gateway(gateway_stub());
        let result = runtime.execute(&CancellationToken::new(), &req).await.unwrap();
        assert_eq!(result.backend.kind, BackendKind::UnsafeHost);
    }

    #[tokio::test]
    async fn missing_gateway_rejected_before_dispatch() {
        let runtime = Runtime::builder()
            .with_backend(
                SecurityProfile::Dev,
                Arc::new(StubBackend {
                    kind: BackendKind::UnsafeHost,
                    stdout: String::new(),
                }),
            )
            .build()
            .unwrap();

        let req = ExecuteRequest::new("1+1", SecurityProfile::Dev);
        let err = runtime.execute(&CancellationToken::new(), &req).await.unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::MissingGateway));
    }

    #[tokio::test]
    async fn falls_back_to_stdout_extraction_when_driver_leaves_value_null() {
        let runtime = Runtime::builder()
            .with_backend(
                SecurityProfile::Dev,
                Arc::new(StubBackend {
                    kind: BackendKind::UnsafeHost,
                    stdout: "noise\n__OUT__:{\"n\":7}\n".to_string(),
                }),
            )
            .build()
            .unwrap();

        let req = ExecuteRequest::new("1+1", SecurityProfile::Dev).with_gateway(gateway_stub());
        let result = runtime.execute(&CancellationToken::new(), &req).await.unwrap();
        assert_eq!(result.value, serde_json::json!({"n": 7}));
    }
}
