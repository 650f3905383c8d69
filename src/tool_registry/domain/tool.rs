//! MCP tool descriptor value object.

use super::{McpServerName, ToolRegistryDomainError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Metadata for a tool exposed by an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    name: String,
    description: Option<String>,
    input_schema: Value,
    server: McpServerName,
}

impl ToolDescriptor {
    /// Creates a tool descriptor owned by `server`.
    ///
    /// A `null` input schema is replaced by an empty object schema. Blank
    /// descriptions are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyToolName`] when `name` is empty
    /// after trimming.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        input_schema: Value,
        server: McpServerName,
    ) -> Result<Self, ToolRegistryDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(ToolRegistryDomainError::EmptyToolName);
        }

        let normalized_description = description
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());

        let schema = if input_schema.is_null() {
            json!({"type": "object"})
        } else {
            input_schema
        };

        Ok(Self {
            name: normalized_name,
            description: normalized_description,
            input_schema: schema,
            server,
        })
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional tool description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the JSON Schema describing the tool's arguments.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns the name of the server that exposes this tool.
    #[must_use]
    pub const fn server(&self) -> &McpServerName {
        &self.server
    }
}
