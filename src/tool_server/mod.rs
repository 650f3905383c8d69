//! Minimal MCP tool servers used by the demo binaries and integration tests.
//!
//! [`ToolServer`] is an `rmcp` server handler independent of transport;
//! [`serve_stdio`] and [`streamable_http_router`] put it on the wire.

mod handler;
mod http;
mod stdio;
mod toolsets;

pub use handler::{FnTool, ToolDefinition, ToolHandler, ToolServer};
pub use http::{MCP_PATH, StreamableHttpOptions, serve_http, streamable_http_router};
pub use stdio::{serve_io, serve_stdio};
pub use toolsets::{COLOMBO_FORECAST, forecast, math_server, weather_server};
