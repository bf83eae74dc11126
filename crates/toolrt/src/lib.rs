//! The public facade (§2 "Facade"): wires the backend registry, the
//! aggregator, the runner, and the code executor into one entry point —
//! `RunTool`, `RunChain`, `ExecuteCode`, `SearchTools`, `DescribeTool` — so
//! an embedding host never has to construct the pipeline components by
//! hand.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

pub mod config;
pub mod telemetry;

pub use config::{ConfigError, RuntimeConfig};
pub use telemetry::init_tracing;
use tokio_util::sync::CancellationToken;
use toolrt_backends::{Aggregator, Backend, BackendError, Registry};
use toolrt_exec::{
    DetailLevel, Engine, ExecuteOutcome, ExecuteParams, Executor, ExecutorConfig, RegistryCatalog,
    ToolCatalog,
};
use toolrt_runner::{ChainOutcome, RunStep, Runner, RunnerError};
use toolrt_types::{Tool, ToolId};

pub use toolrt_backends as backends;
pub use toolrt_exec as exec;
pub use toolrt_runner as runner;
pub use toolrt_sandbox as sandbox;
pub use toolrt_types as types;

#[derive(Debug, Clone, thiserror::Error)]
pub enum FacadeError {
    #[error("malformed tool id {0:?}")]
    InvalidToolId(String),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("code executor is not configured on this runtime")]
    ExecutorNotConfigured,
}

impl FacadeError {
    pub fn kind(&self) -> toolrt_types::ErrorKind {
        match self {
            FacadeError::InvalidToolId(_) => toolrt_types::ErrorKind::InvalidToolId,
            FacadeError::Runner(e) => e.kind(),
            FacadeError::ExecutorNotConfigured => toolrt_types::ErrorKind::Configuration,
        }
    }
}

/// The assembled substrate: a backend registry feeding an aggregator (for
/// search/describe) and a runner (for dispatch), plus an optional code
/// executor for snippet orchestration. Instance-scoped, no global state —
/// an embedding host constructs one per isolated tenant/session as needed.
pub struct ToolRuntime {
    registry: Arc<Registry>,
    aggregator: Arc<Aggregator>,
    runner: Arc<Runner>,
    catalog: Arc<dyn ToolCatalog>,
    executor: Option<Arc<Executor>>,
}

pub struct ToolRuntimeBuilder {
    registry: Arc<Registry>,
    runner_builder: Option<Box<dyn FnOnce(Runner) -> Runner + Send>>,
    executor_config: Option<ExecutorConfig>,
    engine: Option<Arc<dyn Engine>>,
}

impl ToolRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            runner_builder: None,
            executor_config: None,
            engine: None,
        }
    }

    /// Register a backend instance under `name` before the runtime starts
    /// serving calls.
    pub async fn with_backend(
        self,
        name: impl Into<String>,
        backend: Arc<dyn Backend>,
    ) -> Result<Self, BackendError> {
        self.registry.register(name, backend).await?;
        Ok(self)
    }

    /// Customize the [`Runner`] (selector, validators, fallbacks) before
    /// it is wrapped by this facade.
    pub fn with_runner(mut self, f: impl FnOnce(Runner) -> Runner + Send + 'static) -> Self {
        self.runner_builder = Some(Box::new(f));
        self
    }

    /// Enable [`ToolRuntime::execute_code`] with the given defaults and
    /// [`Engine`] (e.g. a [`toolrt_sandbox::SandboxEngine`] bound to a
    /// configured [`toolrt_sandbox::Runtime`]).
    pub fn with_executor(mut self, config: ExecutorConfig, engine: Arc<dyn Engine>) -> Self {
        self.executor_config = Some(config);
        self.engine = Some(engine);
        self
    }

    /// Start every registered backend's lifecycle (§3 "Registry" —
    /// `StartAll` iterates in registration order and aborts on first
    /// failure, leaving already-started backends running).
    pub async fn start_all(&self, ctx: &CancellationToken) -> Result<(), BackendError> {
        self.registry.start_all(ctx).await
    }

    pub fn build(self) -> ToolRuntime {
        let runner = Runner::new(Arc::new(toolrt_runner::ToolIndex::new(self.registry.clone())));
        let runner = match self.runner_builder {
            Some(f) => f(runner),
            None => runner,
        };
        let runner = Arc::new(runner);

        let aggregator = Arc::new(Aggregator::new(self.registry.clone()));
        let catalog: Arc<dyn ToolCatalog> =
            Arc::new(RegistryCatalog::new(self.registry.clone(), aggregator.clone()));

        let executor = match (self.executor_config, self.engine) {
            (Some(config), Some(engine)) => Some(Arc::new(Executor::new(
                config,
                catalog.clone(),
                runner.clone(),
                engine,
            ))),
            _ => None,
        };

        ToolRuntime {
            registry: self.registry,
            aggregator,
            runner,
            catalog,
            executor,
        }
    }
}

impl Default for ToolRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRuntime {
    pub fn builder() -> ToolRuntimeBuilder {
        ToolRuntimeBuilder::new()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn runner(&self) -> &Arc<Runner> {
        &self.runner
    }

    /// `RunTool` — parses `full_tool_id` (`backend:name`) and dispatches
    /// through the runner's resolve-validate-dispatch pipeline (§4.4).
    pub async fn run_tool(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        args: HashMap<String, Value>,
    ) -> Result<Value, FacadeError> {
        let id = ToolId::parse(full_tool_id).map_err(|_| FacadeError::InvalidToolId(full_tool_id.to_string()))?;
        let outcome = self.runner.run(ctx, &id, args).await?;
        Ok(outcome.value)
    }

    /// `RunChain` — executes an ordered sequence of tool calls, halting at
    /// the first failing step (§4.4 "Chain semantics").
    pub async fn run_chain(&self, ctx: &CancellationToken, steps: Vec<RunStep>) -> ChainOutcome {
        self.runner.run_chain(ctx, steps).await
    }

    /// `ExecuteCode` — runs a bounded snippet via the configured
    /// [`Executor`]. Returns [`FacadeError::ExecutorNotConfigured`] if the
    /// runtime was built without one.
    pub async fn execute_code(
        &self,
        ctx: &CancellationToken,
        params: ExecuteParams,
    ) -> Result<ExecuteOutcome, FacadeError> {
        let executor = self.executor.as_ref().ok_or(FacadeError::ExecutorNotConfigured)?;
        Ok(executor.execute_code(ctx, params).await)
    }

    /// `SearchTools` — queries the flat catalog over every enabled backend.
    pub async fn search_tools(&self, ctx: &CancellationToken, query: &str, limit: usize) -> Vec<Tool> {
        self.catalog.search_tools(ctx, query, limit).await
    }

    pub async fn list_namespaces(&self, ctx: &CancellationToken) -> Vec<String> {
        self.catalog.list_namespaces(ctx).await
    }

    /// `DescribeTool`.
    pub async fn describe_tool(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        detail: DetailLevel,
    ) -> Option<String> {
        self.catalog.describe_tool(ctx, full_tool_id, detail).await
    }

    pub async fn list_tool_examples(&self, ctx: &CancellationToken, full_tool_id: &str, max: usize) -> Vec<String> {
        self.catalog.list_tool_examples(ctx, full_tool_id, max).await
    }
}
