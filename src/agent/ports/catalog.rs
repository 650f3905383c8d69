//! Port through which the agent loop reaches tools.

use crate::agent::domain::ToolSpec;
use crate::tool_registry::domain::ToolResponse;
use crate::tool_registry::services::InvocationError;
use async_trait::async_trait;
use serde_json::Value;

/// Lists and invokes tools on behalf of the model.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    /// Returns the tools to advertise to the model.
    async fn tool_specs(&self) -> Vec<ToolSpec>;

    /// Invokes a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError`] when the call did not produce a response.
    async fn call(&self, name: &str, arguments: Value) -> Result<ToolResponse, InvocationError>;
}
