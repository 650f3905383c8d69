//! Multi-transport MCP tool registry.
//!
//! The registry discovers tools exposed by independently configured MCP
//! servers, each reached over its own transport, and presents them as one
//! mapping from tool name to invocable handle. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
