//! Shared data model, error taxonomy, and small helpers used by every layer
//! of the tool-execution substrate: ID parsing, deep-copy normalization, and
//! the tool-call trace record.

pub mod deepcopy;
pub mod error;
pub mod tool;
pub mod tool_id;
pub mod trace;

pub use error::{ErrorKind, TaxonomyError};
pub use tool::{Tool, ToolAnnotations};
pub use tool_id::ToolId;
pub use trace::{ToolCallOp, ToolCallRecord};
