//! MCP server descriptor value object.

use super::{McpServerName, McpTransport, ToolRegistryDomainError};
use serde::{Deserialize, Serialize};

/// Immutable description of one configured MCP server.
///
/// A descriptor pairs a validated name with exactly one transport
/// configuration. It is built once from configuration and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    name: McpServerName,
    transport: McpTransport,
}

impl ServerDescriptor {
    /// Creates a server descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError`] when the transport parameters are
    /// malformed.
    pub fn new(
        name: McpServerName,
        transport: McpTransport,
    ) -> Result<Self, ToolRegistryDomainError> {
        transport.validate()?;
        Ok(Self { name, transport })
    }

    /// Returns the validated server name.
    #[must_use]
    pub const fn name(&self) -> &McpServerName {
        &self.name
    }

    /// Returns the transport settings.
    #[must_use]
    pub const fn transport(&self) -> &McpTransport {
        &self.transport
    }
}
