pub mod container;
pub mod microvm;
pub mod orchestrator;
pub mod remote;
pub mod unsafe_host;
pub mod wasm;

pub use container::{ContainerClient, ContainerDriver};
pub use microvm::{MicroVmClient, MicroVmDriver, VmShape};
pub use orchestrator::{LifecycleStatus, OrchestratorDriver, OrchestratorLifecycle};
pub use remote::{GatewayEndpoint, RemoteDriver};
pub use unsafe_host::{InterpreterResolver, UnsafeHostDriver, default_interpreter_resolver};
pub use wasm::{WasmDriver, WasmEngineClient, WasmLaunchOptions};
