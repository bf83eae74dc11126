//! The code executor: the public entry point that wires together an
//! [`Engine`], a [`Tools`] environment, and limit/default application.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use toolrt_runner::Runner;
use toolrt_types::ToolCallRecord;
use tracing::instrument;

use crate::catalog::ToolCatalog;
use crate::engine::Engine;
use crate::error::ExecError;
use crate::tools::{Tools, ToolsLimits};

/// Parameters for one [`Executor::execute_code`] call. Zero values for
/// `language`/`timeout`/`max_tool_calls` mean "use the executor's
/// configured default".
#[derive(Debug, Clone)]
pub struct ExecuteParams {
    pub language: String,
    pub code: String,
    pub timeout: Duration,
    pub max_tool_calls: usize,
    pub max_chain_steps: usize,
}

impl ExecuteParams {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            language: String::new(),
            code: code.into(),
            timeout: Duration::ZERO,
            max_tool_calls: 0,
            max_chain_steps: 0,
        }
    }
}

/// Static configuration the executor applies when a request omits a field.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub default_language: String,
    pub default_timeout: Duration,
    pub max_tool_calls: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_language: "javascript".to_string(),
            default_timeout: Duration::from_secs(30),
            max_tool_calls: 0,
        }
    }
}

/// Populated even when `error` is set, so the caller can observe partial
/// progress (§7 "User-visible behavior").
#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    pub value: serde_json::Value,
    pub stdout: String,
    pub stderr: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub duration: Duration,
    pub error: Option<ExecError>,
}

pub struct Executor {
    config: ExecutorConfig,
    catalog: Arc<dyn ToolCatalog>,
    runner: Arc<Runner>,
    engine: Arc<dyn Engine>,
}

impl Executor {
    pub fn new(
        config: ExecutorConfig,
        catalog: Arc<dyn ToolCatalog>,
        runner: Arc<Runner>,
        engine: Arc<dyn Engine>,
    ) -> Self {
        Self {
            config,
            catalog,
            runner,
            engine,
        }
    }

    #[instrument(skip(self, ctx, params), fields(language = %params.language))]
    pub async fn execute_code(&self, ctx: &CancellationToken, mut params: ExecuteParams) -> ExecuteOutcome {
        if params.language.is_empty() {
            params.language = self.config.default_language.clone();
        }
        if params.timeout.is_zero() {
            params.timeout = self.config.default_timeout;
        }

        let effective_max_calls = effective_cap(params.max_tool_calls, self.config.max_tool_calls);

        let tools = Arc::new(Tools::new(
            self.catalog.clone(),
            self.runner.clone(),
            ToolsLimits {
                max_tool_calls: effective_max_calls,
                max_chain_steps: params.max_chain_steps,
            },
        ));

        let child_ctx = ctx.child_token();
        let timeout_guard = if !params.timeout.is_zero() {
            let token = child_ctx.clone();
            let timeout = params.timeout;
            Some(tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                token.cancel();
            }))
        } else {
            None
        };

        let start = Instant::now();
        let run_result = self.engine.run(&child_ctx, &params, tools.clone()).await;
        let duration = start.elapsed();

        let timed_out = child_ctx.is_cancelled();
        if let Some(guard) = timeout_guard {
            guard.abort();
        }

        let (value, engine_stdout, engine_stderr, error) = match run_result {
            Ok(engine_result) => (
                engine_result.value,
                engine_result.stdout,
                engine_result.stderr,
                None,
            ),
            Err(code_error) if timed_out => (
                serde_json::Value::Null,
                String::new(),
                String::new(),
                Some(ExecError::LimitExceeded(format!(
                    "execution exceeded timeout of {:?}: {code_error}",
                    params.timeout
                ))),
            ),
            Err(code_error) => (
                serde_json::Value::Null,
                String::new(),
                String::new(),
                Some(ExecError::CodeExecution(code_error)),
            ),
        };

        // `Tools::println` (free-standing host-side writes) and the
        // engine/sandbox's own captured stdout (e.g. the snippet's real
        // stdout inside a driver) are two independent sources; neither
        // should shadow the other.
        let mut stdout = tools.stdout().await;
        stdout.push_str(&engine_stdout);

        ExecuteOutcome {
            value,
            stdout,
            stderr: engine_stderr,
            tool_calls: tools.tool_calls().await,
            duration,
            error,
        }
    }
}

/// `min(requested, configured)` where zero on either side means "no cap
/// from that source".
fn effective_cap(requested: usize, configured: usize) -> usize {
    match (requested, configured) {
        (0, c) => c,
        (r, 0) => r,
        (r, c) => r.min(c),
    }
}
