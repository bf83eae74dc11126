//! The in-process facade ("Tools") a code snippet calls into: a bundle of
//! capabilities handed to code running under the host, with call/step
//! accounting and trace capture.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use toolrt_runner::{RunStep, Runner};
use toolrt_types::{ToolCallOp, ToolCallRecord, ToolId, deepcopy};

use crate::catalog::{DetailLevel, ToolCatalog};
use crate::error::ExecError;

/// Zero means "unlimited" for both limits, matching the wire convention
/// used throughout this layer.
#[derive(Debug, Clone, Copy)]
pub struct ToolsLimits {
    pub max_tool_calls: usize,
    pub max_chain_steps: usize,
}

impl Default for ToolsLimits {
    fn default() -> Self {
        Self {
            max_tool_calls: 0,
            max_chain_steps: 0,
        }
    }
}

/// Capability surface exposed to a running snippet. Constructed fresh per
/// [`crate::executor::Executor::execute_code`] call; the stdout buffer and
/// the tool-call trace are append-only and read back only after the
/// snippet finishes.
pub struct Tools {
    catalog: Arc<dyn ToolCatalog>,
    runner: Arc<Runner>,
    limits: ToolsLimits,
    call_count: AtomicUsize,
    stdout: Mutex<String>,
    trace: Mutex<Vec<ToolCallRecord>>,
}

impl Tools {
    pub fn new(catalog: Arc<dyn ToolCatalog>, runner: Arc<Runner>, limits: ToolsLimits) -> Self {
        Self {
            catalog,
            runner,
            limits,
            call_count: AtomicUsize::new(0),
            stdout: Mutex::new(String::new()),
            trace: Mutex::new(Vec::new()),
        }
    }

    pub async fn search_tools(
        &self,
        ctx: &CancellationToken,
        query: &str,
        limit: usize,
    ) -> Result<Vec<toolrt_types::Tool>, ExecError> {
        check_cancelled(ctx)?;
        Ok(self.catalog.search_tools(ctx, query, limit).await)
    }

    pub async fn list_namespaces(&self, ctx: &CancellationToken) -> Result<Vec<String>, ExecError> {
        check_cancelled(ctx)?;
        Ok(self.catalog.list_namespaces(ctx).await)
    }

    pub async fn describe_tool(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        detail: DetailLevel,
    ) -> Result<Option<String>, ExecError> {
        check_cancelled(ctx)?;
        Ok(self.catalog.describe_tool(ctx, full_tool_id, detail).await)
    }

    pub async fn list_tool_examples(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        max: usize,
    ) -> Result<Vec<String>, ExecError> {
        check_cancelled(ctx)?;
        Ok(self.catalog.list_tool_examples(ctx, full_tool_id, max).await)
    }

    pub async fn println(&self, line: &str) {
        let mut stdout = self.stdout.lock().await;
        stdout.push_str(line);
        stdout.push('\n');
    }

    /// Invoke one tool. Counts against `maxToolCalls`: the counter is
    /// incremented *before* dispatch, and the call never reaches the
    /// backend if that increment would exceed the limit.
    pub async fn run_tool(
        &self,
        ctx: &CancellationToken,
        id: &ToolId,
        args: HashMap<String, Value>,
    ) -> Result<Value, ExecError> {
        check_cancelled(ctx)?;
        self.reserve_calls(1)?;

        let start = Instant::now();
        let normalized_args = deepcopy::normalize_args(&args);
        let result = self.runner.run(ctx, id, args).await;
        let duration = start.elapsed();

        let record = match &result {
            Ok(outcome) => ToolCallRecord::success(
                id.to_string(),
                normalized_args,
                outcome.value.clone(),
                Some(outcome.backend_kind.clone()),
                duration,
            ),
            Err(e) => ToolCallRecord::failure(
                id.to_string(),
                normalized_args,
                e.to_string(),
                ToolCallOp::Run,
                None,
                duration,
            ),
        };
        self.trace.lock().await.push(record);

        result.map(|outcome| outcome.value).map_err(ExecError::from)
    }

    /// Invoke a chain. Counts against `maxToolCalls` by reserving
    /// `len(steps)` up front and releasing the unused remainder if the
    /// chain halts early; also checked against `maxChainSteps` before any
    /// step runs.
    pub async fn run_chain(
        &self,
        ctx: &CancellationToken,
        steps: Vec<RunStep>,
    ) -> Result<Value, ExecError> {
        check_cancelled(ctx)?;

        if self.limits.max_chain_steps != 0 && steps.len() > self.limits.max_chain_steps {
            return Err(ExecError::LimitExceeded(format!(
                "chain has {} steps, limit is {}",
                steps.len(),
                self.limits.max_chain_steps
            )));
        }

        let reserved = steps.len();
        self.reserve_calls(reserved)?;

        let start = Instant::now();
        let outcome = self.runner.run_chain(ctx, steps).await;
        let duration = start.elapsed();
        let executed = outcome.steps.len();

        if executed < reserved {
            self.release_calls(reserved - executed);
        }

        let per_step_duration = if executed == 0 {
            duration
        } else {
            duration / executed as u32
        };

        let mut trace = self.trace.lock().await;
        for step in &outcome.steps {
            let normalized_args = deepcopy::normalize_args(&step.effective_args);
            let record = match &step.outcome {
                Ok(run_outcome) => ToolCallRecord::success(
                    step.id.to_string(),
                    normalized_args,
                    run_outcome.value.clone(),
                    Some(run_outcome.backend_kind.clone()),
                    per_step_duration,
                ),
                Err(e) => ToolCallRecord::failure(
                    step.id.to_string(),
                    normalized_args,
                    e.to_string(),
                    ToolCallOp::Chain,
                    None,
                    per_step_duration,
                ),
            };
            trace.push(record);
        }
        drop(trace);

        match outcome.error {
            Some(e) => Err(ExecError::from(e)),
            None => Ok(outcome.last_value.unwrap_or(Value::Null)),
        }
    }

    pub async fn stdout(&self) -> String {
        self.stdout.lock().await.clone()
    }

    pub async fn tool_calls(&self) -> Vec<ToolCallRecord> {
        self.trace.lock().await.clone()
    }

    fn reserve_calls(&self, count: usize) -> Result<(), ExecError> {
        if self.limits.max_tool_calls == 0 {
            self.call_count.fetch_add(count, Ordering::SeqCst);
            return Ok(());
        }
        loop {
            let current = self.call_count.load(Ordering::SeqCst);
            let next = current + count;
            if next > self.limits.max_tool_calls {
                return Err(ExecError::LimitExceeded(format!(
                    "max tool calls ({}) exceeded",
                    self.limits.max_tool_calls
                )));
            }
            if self
                .call_count
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    fn release_calls(&self, count: usize) {
        self.call_count.fetch_sub(count, Ordering::SeqCst);
    }
}

fn check_cancelled(ctx: &CancellationToken) -> Result<(), ExecError> {
    if ctx.is_cancelled() {
        Err(ExecError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use toolrt_backends::{Backend, BackendError, BackendMetadata, LifecycleState, Registry};
    use toolrt_runner::ToolIndex;

    struct EchoBackend;

    #[async_trait]
    impl Backend for EchoBackend {
        fn kind(&self) -> &str {
            "local"
        }
        fn name(&self) -> &str {
            "local"
        }
        fn enabled(&self) -> bool {
            true
        }
        fn lifecycle(&self) -> LifecycleState {
            LifecycleState::Started
        }
        async fn list_tools(
            &self,
            _ctx: &CancellationToken,
        ) -> Result<Vec<toolrt_types::Tool>, BackendError> {
            Ok(vec![toolrt_types::Tool::new(
                "echo",
                "echoes",
                json!({"type": "object"}),
            )])
        }
        async fn execute(
            &self,
            _ctx: &CancellationToken,
            _name: &str,
            args: Value,
        ) -> Result<Value, BackendError> {
            Ok(args)
        }
        fn metadata(&self) -> BackendMetadata {
            BackendMetadata::new("local", "local")
        }
    }

    struct EmptyCatalog;

    #[async_trait]
    impl ToolCatalog for EmptyCatalog {
        async fn search_tools(
            &self,
            _ctx: &CancellationToken,
            _query: &str,
            _limit: usize,
        ) -> Vec<toolrt_types::Tool> {
            Vec::new()
        }
        async fn list_namespaces(&self, _ctx: &CancellationToken) -> Vec<String> {
            Vec::new()
        }
        async fn describe_tool(
            &self,
            _ctx: &CancellationToken,
            _full_tool_id: &str,
            _detail: DetailLevel,
        ) -> Option<String> {
            None
        }
        async fn list_tool_examples(
            &self,
            _ctx: &CancellationToken,
            _full_tool_id: &str,
            _max: usize,
        ) -> Vec<String> {
            Vec::new()
        }
    }

    async fn test_tools(limits: ToolsLimits) -> Tools {
        let registry = Arc::new(Registry::new());
        registry.register("local", Arc::new(EchoBackend)).await.unwrap();
        let runner = Arc::new(Runner::new(Arc::new(ToolIndex::new(registry))));
        Tools::new(Arc::new(EmptyCatalog), runner, limits)
    }

    #[tokio::test]
    async fn run_tool_records_success() {
        let tools = test_tools(ToolsLimits::default()).await;
        let mut args = HashMap::new();
        args.insert("x".to_string(), json!(1));
        let result = tools
            .run_tool(&CancellationToken::new(), &ToolId::new("local", "echo"), args)
            .await
            .unwrap();
        assert_eq!(result, json!({"x": 1}));
        assert_eq!(tools.tool_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn run_tool_respects_max_calls() {
        let tools = test_tools(ToolsLimits {
            max_tool_calls: 1,
            max_chain_steps: 0,
        })
        .await;
        let id = ToolId::new("local", "echo");
        tools
            .run_tool(&CancellationToken::new(), &id, HashMap::new())
            .await
            .unwrap();
        let err = tools
            .run_tool(&CancellationToken::new(), &id, HashMap::new())
            .await
            .unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::LimitExceeded));
    }

    #[tokio::test]
    async fn chain_step_limit_rejects_before_running() {
        let tools = test_tools(ToolsLimits {
            max_tool_calls: 0,
            max_chain_steps: 1,
        })
        .await;
        let steps = vec![
            RunStep::new(ToolId::new("local", "echo"), HashMap::new()),
            RunStep::new(ToolId::new("local", "echo"), HashMap::new()),
        ];
        let err = tools
            .run_chain(&CancellationToken::new(), steps)
            .await
            .unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::LimitExceeded));
        assert_eq!(tools.tool_calls().await.len(), 0);
    }

    #[tokio::test]
    async fn chain_releases_unused_reservation_on_halt() {
        let tools = test_tools(ToolsLimits {
            max_tool_calls: 3,
            max_chain_steps: 0,
        })
        .await;
        let steps = vec![
            RunStep::new(ToolId::new("local", "echo"), HashMap::new()),
            RunStep::new(ToolId::new("local", "missing"), HashMap::new()),
        ];
        tools.run_chain(&CancellationToken::new(), steps).await.unwrap_err();

        // Two were reserved, one executed+one failed (still executed), so
        // all 2 should be consumed, leaving exactly one more call available.
        let id = ToolId::new("local", "echo");
        tools
            .run_tool(&CancellationToken::new(), &id, HashMap::new())
            .await
            .unwrap();
        let err = tools
            .run_tool(&CancellationToken::new(), &id, HashMap::new())
            .await
            .unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::LimitExceeded));
    }
}
