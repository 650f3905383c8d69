//! Adapter implementations for the MCP session ports.

pub mod mcp;

mod runtime;

pub use mcp::TransportConnector;
pub use runtime::{InMemoryConnector, InMemoryTool};
