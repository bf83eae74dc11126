//! Backend interface, concrete backend implementations, registry, and
//! cross-backend aggregation.

pub mod aggregator;
pub mod backend;
pub mod backends;
pub mod error;
pub mod filter;
pub mod registry;

pub use aggregator::Aggregator;
pub use backend::{
    Backend, BackendMetadata, ConfigurableBackend, Lifecycle, LifecycleState, StreamingBackend,
    ValueStream,
};
pub use error::BackendError;
pub use filter::ToolFilter;
pub use registry::Registry;
