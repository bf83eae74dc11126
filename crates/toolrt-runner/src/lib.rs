//! Resolution, validation, and dispatch pipeline for tool execution, plus
//! ordered multi-step chains.

pub mod error;
pub mod index;
pub mod runner;
pub mod selector;
pub mod types;
pub mod validator;

pub use error::RunnerError;
pub use index::ToolIndex;
pub use runner::Runner;
pub use selector::{BackendSelector, default_selector};
pub use types::{
    BackendResolverFallback, BoxFuture, ChainOutcome, RunOutcome, RunStep, StepResult,
    ToolResolverFallback,
};
pub use validator::{JsonSchemaValidator, SchemaValidator};
