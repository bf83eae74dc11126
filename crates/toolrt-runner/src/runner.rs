//! The execution pipeline: resolve a tool id, validate its arguments,
//! dispatch to a backend, and optionally thread results through a chain.
//! Resolution goes through a pluggable index, then fallback closures, then
//! a backend selector, in that order.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use toolrt_backends::Backend;
use toolrt_types::ToolId;
use tracing::{instrument, warn};

use crate::error::RunnerError;
use crate::index::ToolIndex;
use crate::selector::{BackendSelector, default_selector};
use crate::types::{
    BackendResolverFallback, ChainOutcome, RunOutcome, RunStep, StepResult, ToolResolverFallback,
};
use crate::validator::{JsonSchemaValidator, SchemaValidator};

pub struct Runner {
    index: Arc<ToolIndex>,
    tool_resolver_fallback: Option<ToolResolverFallback>,
    backend_resolver_fallback: Option<BackendResolverFallback>,
    selector: BackendSelector,
    validator: Arc<dyn SchemaValidator>,
    validate_input: bool,
    validate_output: bool,
}

impl Runner {
    pub fn new(index: Arc<ToolIndex>) -> Self {
        Self {
            index,
            tool_resolver_fallback: None,
            backend_resolver_fallback: None,
            selector: default_selector(),
            validator: Arc::new(JsonSchemaValidator),
            validate_input: true,
            validate_output: true,
        }
    }

    pub fn with_tool_resolver_fallback(mut self, fallback: ToolResolverFallback) -> Self {
        self.tool_resolver_fallback = Some(fallback);
        self
    }

    pub fn with_backend_resolver_fallback(mut self, fallback: BackendResolverFallback) -> Self {
        self.backend_resolver_fallback = Some(fallback);
        self
    }

    pub fn with_selector(mut self, selector: BackendSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_input_validation(mut self, enabled: bool) -> Self {
        self.validate_input = enabled;
        self
    }

    pub fn with_output_validation(mut self, enabled: bool) -> Self {
        self.validate_output = enabled;
        self
    }

    #[instrument(skip(self, ctx, args), fields(tool_id = %id))]
    pub async fn run(
        &self,
        ctx: &CancellationToken,
        id: &ToolId,
        args: HashMap<String, Value>,
    ) -> Result<RunOutcome, RunnerError> {
        if ctx.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }

        let tool = match self.index.resolve_tool(ctx, id).await {
            Some(tool) => tool,
            None => match &self.tool_resolver_fallback {
                Some(fallback) => fallback(id.clone())
                    .await
                    .ok_or_else(|| RunnerError::ToolNotFound(id.to_string()))?,
                None => return Err(RunnerError::ToolNotFound(id.to_string())),
            },
        };

        let candidates = self.index.candidate_backends(ctx, id).await;
        let candidates = if candidates.is_empty() {
            match &self.backend_resolver_fallback {
                Some(fallback) => fallback(id.clone()).await,
                None => Vec::new(),
            }
        } else {
            candidates
        };

        let backend: Arc<dyn Backend> = if candidates.len() > 1 {
            (self.selector)(&candidates)
                .ok_or_else(|| RunnerError::BackendNotFound(id.to_string()))?
        } else {
            candidates
                .into_iter()
                .next()
                .ok_or_else(|| RunnerError::BackendNotFound(id.to_string()))?
        };

        let args_value = Value::Object(args.into_iter().collect());

        if self.validate_input {
            self.validator
                .validate(&tool.input_schema, &args_value)
                .map_err(|source| RunnerError::Validation {
                    op: "validate-input".to_string(),
                    source,
                })?;
        }

        let result = backend.execute(ctx, &id.name, args_value).await?;

        let mut output_validation_error = None;
        if self.validate_output
            && let Some(output_schema) = &tool.output_schema
            && let Err(e) = self.validator.validate(output_schema, &result)
        {
            warn!(tool_id = %id, error = %e, "output failed schema validation");
            output_validation_error = Some(e);
        }

        Ok(RunOutcome {
            value: result,
            backend_kind: backend.kind().to_string(),
            output_validation_error,
        })
    }

    #[instrument(skip(self, ctx, steps))]
    pub async fn run_chain(&self, ctx: &CancellationToken, steps: Vec<RunStep>) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();

        for (index, step) in steps.into_iter().enumerate() {
            if ctx.is_cancelled() {
                outcome.error = Some(RunnerError::Cancelled);
                break;
            }

            let mut effective_args = step.args;
            if step.use_previous {
                let previous = outcome.last_value.clone().unwrap_or(Value::Null);
                effective_args.insert("previous".to_string(), previous);
            }

            let dispatch_result = self.run(ctx, &step.id, effective_args.clone()).await;
            let terminal_error = dispatch_result.as_ref().err().cloned();

            if let Ok(ref run_outcome) = dispatch_result {
                outcome.last_value = Some(run_outcome.value.clone());
            }

            outcome.steps.push(StepResult {
                index,
                id: step.id,
                effective_args,
                outcome: dispatch_result,
            });

            if let Some(err) = terminal_error {
                outcome.error = Some(err);
                break;
            }
        }

        outcome
    }
}
