//! Port contracts for MCP transport sessions.

mod session;

pub use session::{McpConnector, McpSession, TransportError, TransportResult};
