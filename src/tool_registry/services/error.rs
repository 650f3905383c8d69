//! Error taxonomy for registry operations.

use crate::tool_registry::domain::{
    McpServerName, SchemaViolation, ToolRegistryDomainError, TransportState,
};
use crate::tool_registry::ports::TransportError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A server that could not be reached during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnavailableServer {
    /// Server that failed.
    pub server: McpServerName,
    /// Failure description.
    pub reason: String,
}

impl fmt::Display for UnavailableServer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} ({})", self.server, self.reason)
    }
}

/// Errors returned by [`super::ToolRegistry::register`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// A server name failed validation.
    #[error("invalid MCP server name '{name}': {source}")]
    InvalidServerName {
        /// Name as supplied.
        name: String,
        /// Validation failure.
        source: ToolRegistryDomainError,
    },

    /// A server name appears twice in the batch or is already registered.
    #[error("MCP server '{0}' is already registered")]
    DuplicateName(McpServerName),

    /// Transport parameters are missing, extra, or malformed.
    #[error("invalid transport configuration for MCP server '{server}': {reason}")]
    InvalidTransportConfig {
        /// Server name as supplied.
        server: String,
        /// Description of the problem.
        reason: String,
    },

    /// The registry has been shut down.
    #[error("tool registry is closed")]
    RegistryClosed,
}

/// Errors returned by [`super::ToolRegistry::discover_tools`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The only registered server could not be reached.
    #[error("MCP server '{server}' is unavailable: {reason}")]
    TransportUnavailable {
        /// Server that failed.
        server: McpServerName,
        /// Failure description.
        reason: String,
    },

    /// Every registered server failed.
    #[error("all {} MCP servers are unavailable", .0.len())]
    AllServersUnavailable(Vec<UnavailableServer>),

    /// Two servers expose a tool with the same name.
    #[error("tool '{tool}' is exposed by both '{first_server}' and '{second_server}'")]
    NameCollision {
        /// Colliding tool name.
        tool: String,
        /// Server whose tool was seen first.
        first_server: McpServerName,
        /// Server exposing the duplicate.
        second_server: McpServerName,
    },

    /// Discovery ran before any server was registered.
    #[error("no MCP servers are registered")]
    NoServersRegistered,

    /// The caller cancelled discovery.
    #[error("tool discovery was cancelled")]
    Cancelled,

    /// The registry has been shut down.
    #[error("tool registry is closed")]
    RegistryClosed,
}

/// Errors returned by [`super::ToolRegistry::invoke`].
#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    /// No discovered tool has this name.
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// Arguments do not satisfy the tool's input schema.
    #[error("arguments for tool '{tool}' do not match its schema: {violation}")]
    SchemaMismatch {
        /// Tool name.
        tool: String,
        /// First violation found.
        #[source]
        violation: SchemaViolation,
    },

    /// The transport failed while the call was in flight.
    #[error("tool '{tool}' on MCP server '{server}' failed: {source}")]
    TransportError {
        /// Tool name.
        tool: String,
        /// Owning server.
        server: McpServerName,
        /// Transport failure.
        #[source]
        source: TransportError,
    },

    /// The call did not finish before its deadline.
    #[error("tool '{tool}' timed out after {after:?}")]
    Timeout {
        /// Tool name.
        tool: String,
        /// Budget that was exhausted.
        after: Duration,
    },

    /// The caller cancelled the call.
    #[error("tool '{tool}' was cancelled")]
    Cancelled {
        /// Tool name.
        tool: String,
    },

    /// The owning server has no usable session.
    #[error("MCP server '{server}' is {state}")]
    ServerUnavailable {
        /// Owning server.
        server: McpServerName,
        /// Server state at dispatch time.
        state: TransportState,
    },

    /// The registry has been shut down.
    #[error("tool registry is closed")]
    RegistryClosed,
}
