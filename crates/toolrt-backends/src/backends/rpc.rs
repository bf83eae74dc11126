//! RPC backend: a line-delimited JSON-RPC 2.0 child process. Request/response
//! framing over the child's stdin/stdout, serialized one call at a time —
//! no protocol stack beyond what that framing needs.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use toolrt_types::Tool;
use tracing::{debug, instrument, warn};

use crate::backend::{Backend, BackendMetadata, Lifecycle, LifecycleState};
use crate::error::BackendError;
use crate::filter::ToolFilter;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcToolList {
    tools: Vec<Tool>,
}

struct ChildProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

/// Backend that spawns a child process speaking line-delimited JSON-RPC 2.0
/// on stdin/stdout, exposing `tools/list` and `tools/call` methods.
pub struct RpcBackend {
    name: String,
    enabled: bool,
    lifecycle: Lifecycle,
    command: String,
    args: Vec<String>,
    filter: ToolFilter,
    process: Mutex<Option<ChildProcess>>,
}

impl RpcBackend {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        filter: ToolFilter,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            lifecycle: Lifecycle::new(),
            command: command.into(),
            args,
            filter,
            process: Mutex::new(None),
        }
    }

    async fn spawn(&self) -> Result<ChildProcess, BackendError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BackendError::Unavailable(format!("failed to spawn rpc backend process: {e}"))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BackendError::Unavailable("child has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::Unavailable("child has no stdout".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            let name = self.name.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut line = String::new();
                while let Ok(n) = reader.read_line(&mut line).await {
                    if n == 0 {
                        break;
                    }
                    debug!(target: "rpc_backend", backend = %name, "{}", line.trim());
                    line.clear();
                }
            });
        }

        Ok(ChildProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            next_id: 0,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, BackendError> {
        let mut guard = self.process.lock().await;
        if guard.is_none() {
            *guard = Some(self.spawn().await?);
        }
        let proc = guard.as_mut().expect("just populated");

        proc.next_id += 1;
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: proc.next_id,
            method,
            params,
        };
        let mut line = serde_json::to_string(&request)
            .map_err(|e| BackendError::Remote(format!("failed to encode rpc request: {e}")))?;
        line.push('\n');

        proc.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| BackendError::Unavailable(format!("failed to write to child: {e}")))?;
        proc.stdin
            .flush()
            .await
            .map_err(|e| BackendError::Unavailable(format!("failed to flush child stdin: {e}")))?;

        let mut response_line = String::new();
        let n = proc
            .stdout
            .read_line(&mut response_line)
            .await
            .map_err(|e| BackendError::Unavailable(format!("failed to read from child: {e}")))?;
        if n == 0 {
            return Err(BackendError::Unavailable(
                "rpc backend process closed its stdout".to_string(),
            ));
        }

        let response: RpcResponse = serde_json::from_str(response_line.trim())
            .map_err(|e| BackendError::Remote(format!("invalid rpc response: {e}")))?;

        match (response.result, response.error) {
            (_, Some(err)) => Err(BackendError::Remote(err.message)),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

#[async_trait]
impl Backend for RpcBackend {
    fn kind(&self) -> &str {
        "rpc"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn lifecycle(&self) -> LifecycleState {
        self.lifecycle.get()
    }

    #[instrument(skip(self, ctx), fields(backend.name = %self.name))]
    async fn list_tools(&self, ctx: &CancellationToken) -> Result<Vec<Tool>, BackendError> {
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        let raw = self.call("tools/list", Value::Null).await?;
        let list: RpcToolList = serde_json::from_value(raw)
            .map_err(|e| BackendError::Remote(format!("invalid tools/list payload: {e}")))?;
        Ok(list
            .tools
            .into_iter()
            .filter(|t| self.filter.allows(&t.name))
            .collect())
    }

    #[instrument(skip(self, ctx, args), fields(backend.name = %self.name, tool = %local_tool_name))]
    async fn execute(
        &self,
        ctx: &CancellationToken,
        local_tool_name: &str,
        args: Value,
    ) -> Result<Value, BackendError> {
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        if !self.filter.allows(local_tool_name) {
            return Err(BackendError::ToolNotFound(local_tool_name.to_string()));
        }
        let params = serde_json::json!({ "name": local_tool_name, "arguments": args });
        self.call("tools/call", params).await
    }

    async fn start(&self, _ctx: &CancellationToken) -> Result<(), BackendError> {
        let mut guard = self.process.lock().await;
        if guard.is_none() {
            *guard = Some(self.spawn().await?);
        }
        self.lifecycle.mark_started();
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        let mut guard = self.process.lock().await;
        if let Some(mut proc) = guard.take()
            && let Err(e) = proc.child.kill().await
        {
            warn!(backend = %self.name, error = %e, "failed to kill rpc backend child process");
        }
        self.lifecycle.mark_stopped();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.process.lock().await.is_some()
    }

    fn metadata(&self) -> BackendMetadata {
        BackendMetadata::new(&self.name, "rpc")
            .with_location(format!("{} {}", self.command, self.args.join(" ")))
    }
}

impl Drop for RpcBackend {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.process.try_lock()
            && let Some(proc) = guard.as_mut()
        {
            let _ = proc.child.start_kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONDER_SCRIPT: &str = r#"
while IFS= read -r line; do
  case "$line" in
    *tools/list*) printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"tools":[{"name":"echo","namespace":"ns","description":"echoes its input","input_schema":{}}]}}' ;;
    *tools/call*) printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"ok":true}}' ;;
    *) printf '%s\n' '{"jsonrpc":"2.0","id":1,"error":{"message":"unknown method"}}' ;;
  esac
done
"#;

    fn backend(filter: ToolFilter) -> RpcBackend {
        RpcBackend::new(
            "rpc-svc",
            "sh",
            vec!["-c".to_string(), RESPONDER_SCRIPT.to_string()],
            filter,
        )
    }

    #[tokio::test]
    async fn lists_tools_from_child_process() {
        let backend = backend(ToolFilter::All);
        let tools = backend.list_tools(&CancellationToken::new()).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");
    }

    #[tokio::test]
    async fn executes_tool_via_child_process() {
        let backend = backend(ToolFilter::All);
        let result = backend
            .execute(&CancellationToken::new(), "echo", serde_json::json!({"x": 1}))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn filter_blocks_disallowed_tool_before_dispatch() {
        let backend = backend(ToolFilter::Include(vec!["only_this".to_string()]));
        let err = backend
            .execute(&CancellationToken::new(), "echo", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::ToolNotFound));
    }

    #[tokio::test]
    async fn filter_narrows_list_tools_results() {
        let backend = backend(ToolFilter::Exclude(vec!["echo".to_string()]));
        let tools = backend.list_tools(&CancellationToken::new()).await.unwrap();
        assert!(tools.is_empty());
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits_execute() {
        let backend = backend(ToolFilter::All);
        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = backend
            .execute(&ctx, "echo", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::Cancelled));
    }

    #[tokio::test]
    async fn stop_before_start_is_a_noop() {
        let backend = backend(ToolFilter::All);
        backend.stop().await.unwrap();
        assert_eq!(backend.lifecycle(), LifecycleState::Stopped);
    }
}
