//! MCP client adapters over standard-IO processes and streamable HTTP.

mod connector;
mod session;

pub use connector::{DEFAULT_SHUTDOWN_GRACE, TransportConnector};
