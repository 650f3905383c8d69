//! Domain model for the multi-transport tool registry.
//!
//! The domain models MCP server identity, transport configuration, the
//! per-server transport state machine, discovered tool metadata, argument
//! validation, and tool call results. Infrastructure concerns remain outside
//! this boundary.

mod error;
mod name;
mod response;
mod schema;
mod server;
mod status;
mod tool;
mod transport;

pub use error::ToolRegistryDomainError;
pub use name::McpServerName;
pub use response::{ContentBlock, EmbeddedResource, ToolResponse};
pub use schema::{SchemaViolation, validate_arguments};
pub use server::ServerDescriptor;
pub use status::{ServerStatus, TransportState};
pub use tool::ToolDescriptor;
pub use transport::{
    McpTransport, StderrMode, StdioTransportConfig, StreamableHttpTransportConfig, TransportKind,
};
