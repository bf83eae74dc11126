//! Unsafe-host driver — executes code directly as a host process with no
//! isolation at all: spawn, pipe stdout/stderr, `kill_on_drop`, race against
//! the context and a timeout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::SandboxError;
use crate::extraction::extract_value;
use crate::request::{ExecuteRequest, validate_request};
use crate::result::{BackendInfo, BackendKind, ExecuteResult, Readiness};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps a language tag to the interpreter binary invoked with the snippet
/// on stdin. Callers needing a different mapping supply their own.
pub type InterpreterResolver = std::sync::Arc<dyn Fn(&str) -> Option<&'static str> + Send + Sync>;

pub fn default_interpreter_resolver() -> InterpreterResolver {
    std::sync::Arc::new(|language: &str| match language {
        "javascript" | "js" | "node" => Some("node"),
        "python" | "python3" => Some("python3"),
        "bash" | "sh" => Some("/bin/bash"),
        _ => None,
    })
}

/// Host process execution with zero sandboxing. Every `execute` call logs
/// a prominent warning; callers that require opt-in gating should check
/// `req.metadata` for the confirming key before constructing a request
/// bound to this driver.
pub struct UnsafeHostDriver {
    resolver: InterpreterResolver,
}

impl UnsafeHostDriver {
    pub fn new(resolver: InterpreterResolver) -> Self {
        Self { resolver }
    }
}

impl Default for UnsafeHostDriver {
    fn default() -> Self {
        Self::new(default_interpreter_resolver())
    }
}

#[async_trait]
impl crate::driver::IsolationBackend for UnsafeHostDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::UnsafeHost
    }

    async fn info(&self, _ctx: &CancellationToken) -> BackendInfo {
        BackendInfo {
            kind: BackendKind::UnsafeHost,
            readiness: Readiness::Ready,
            details: "no isolation; runs directly on the host".to_string(),
        }
    }

    async fn execute(
        &self,
        ctx: &CancellationToken,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError> {
        validate_request(req)?;

        warn!(
            language = %req.language,
            "unsafe-host driver executing code with no isolation"
        );

        let interpreter = (self.resolver)(&req.language).ok_or_else(|| {
            SandboxError::InvalidRequest(format!("no host interpreter configured for language {}", req.language))
        })?;

        let timeout = if req.timeout.is_zero() { DEFAULT_TIMEOUT } else { req.timeout };

        let mut cmd = Command::new(interpreter);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| SandboxError::BackendUnavailable(format!("failed to spawn {interpreter}: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SandboxError::BackendUnavailable("failed to capture child stdin".to_string()))?;
        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::BackendUnavailable("failed to capture child stdout".to_string()))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| SandboxError::BackendUnavailable("failed to capture child stderr".to_string()))?;

        let code = req.code.clone();
        let write_handle = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            let _ = stdin.write_all(code.as_bytes()).await;
        });

        let stdout_handle = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
        });
        let stderr_handle = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
        });

        let start = Instant::now();
        let wait_result = tokio::select! {
            _ = ctx.cancelled() => {
                let _ = child.start_kill();
                return Err(SandboxError::Cancelled);
            }
            res = tokio::time::timeout(timeout, child.wait()) => res,
        };

        let _ = write_handle.await;
        let duration = start.elapsed();

        let status = match wait_result {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(SandboxError::BackendUnavailable(format!("child process error: {e}"))),
            Err(_) => {
                let _ = child.start_kill();
                return Err(SandboxError::LimitExceeded(format!(
                    "execution exceeded timeout of {timeout:?}"
                )));
            }
        };

        let stdout = stdout_handle
            .await
            .map_err(|e| SandboxError::BackendUnavailable(e.to_string()))?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        let stderr = stderr_handle
            .await
            .map_err(|e| SandboxError::BackendUnavailable(e.to_string()))?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();

        if !status.success() {
            return Err(SandboxError::SandboxViolation(format!(
                "process exited with status {status}: {stderr}"
            )));
        }

        Ok(ExecuteResult {
            value: extract_value(&stdout),
            stdout,
            stderr,
            duration,
            backend: BackendInfo {
                kind: BackendKind::UnsafeHost,
                readiness: Readiness::Ready,
                details: format!("interpreter={interpreter}"),
            },
            limits_enforced: Vec::new(),
            tool_calls: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::IsolationBackend;
    use crate::gateway::DirectGateway;
    use crate::profile::SecurityProfile;
    use std::sync::Arc;
    use toolrt_exec::{RegistryCatalog, Tools, ToolsLimits};
    use toolrt_runner::{Runner, ToolIndex};

    fn cat_resolver() -> InterpreterResolver {
        Arc::new(|_: &str| Some("/bin/cat"))
    }

    fn gateway() -> Arc<dyn crate::gateway::ToolGateway> {
        let registry = Arc::new(toolrt_backends::Registry::new());
        let aggregator = Arc::new(toolrt_backends::Aggregator::new(Arc::clone(&registry)));
        let catalog = Arc::new(RegistryCatalog::new(Arc::clone(&registry), Arc::clone(&aggregator)));
        let index = Arc::new(ToolIndex::new(registry));
        let runner = Arc::new(Runner::new(index));
        let tools = Arc::new(Tools::new(catalog, runner, ToolsLimits::default()));
        Arc::new(DirectGateway::new(tools))
    }

    #[tokio::test]
    async fn executes_code_via_cat_and_extracts_value() {
        let driver = UnsafeHostDriver::new(cat_resolver());
        let req = ExecuteRequest::new("hello\n__OUT__:{\"n\":42}", SecurityProfile::Dev)
            .with_gateway(gateway());
        let result = driver.execute(&CancellationToken::new(), &req).await.unwrap();
        assert_eq!(result.value, serde_json::json!({"n": 42}));
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn unknown_language_is_rejected() {
        let driver = UnsafeHostDriver::new(Arc::new(|_: &str| None));
        let req = ExecuteRequest::new("print(1)", SecurityProfile::Dev).with_gateway(gateway());
        let err = driver.execute(&CancellationToken::new(), &req).await.unwrap_err();
        assert!(matches!(err, SandboxError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn missing_gateway_rejected_before_spawn() {
        let driver = UnsafeHostDriver::new(cat_resolver());
        let req = ExecuteRequest::new("print(1)", SecurityProfile::Dev);
        let err = driver.execute(&CancellationToken::new(), &req).await.unwrap_err();
        assert!(matches!(err, SandboxError::MissingGateway));
    }

    #[test]
    fn default_interpreter_resolver_covers_common_languages() {
        let resolver = default_interpreter_resolver();
        assert_eq!(resolver("python"), Some("python3"));
        assert_eq!(resolver("js"), Some("node"));
        assert_eq!(resolver("unknown-language"), None);
    }
}

