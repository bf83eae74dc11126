//! Concrete [`crate::backend::Backend`] implementations.

pub mod http;
pub mod local;
pub mod rpc;

pub use http::HttpBackend;
pub use local::{LocalBackend, LocalHandler};
pub use rpc::RpcBackend;
