//! [`ToolCatalog`] backed by the MCP tool registry.

use crate::agent::domain::ToolSpec;
use crate::agent::ports::ToolCatalog;
use crate::tool_registry::domain::ToolResponse;
use crate::tool_registry::ports::McpConnector;
use crate::tool_registry::services::{InvocationError, InvokeOptions, ToolRegistry};
use async_trait::async_trait;
use mockable::Clock;
use serde_json::Value;

#[async_trait]
impl<C, K> ToolCatalog for ToolRegistry<C, K>
where
    C: McpConnector,
    K: Clock + Send + Sync,
{
    async fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools().await.iter().map(ToolSpec::from).collect()
    }

    async fn call(&self, name: &str, arguments: Value) -> Result<ToolResponse, InvocationError> {
        self.invoke(name, arguments, InvokeOptions::new()).await
    }
}
