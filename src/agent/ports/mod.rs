//! Port contracts used by the agent loop.

mod catalog;
mod model;

pub use catalog::ToolCatalog;
pub use model::{ChatRequest, ModelBackend, ModelError};
