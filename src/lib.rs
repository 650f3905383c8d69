//! Toolbridge: multi-transport MCP tool registry with a bounded agent loop.
//!
//! Tools exposed by independently configured Model Context Protocol servers,
//! each reached over its own transport, are discovered into one name-keyed
//! registry and driven by a language model through an explicit agent loop.
//!
//! # Architecture
//!
//! Each feature module follows hexagonal architecture principles:
//!
//! - **Domain**: Pure types and rules with no infrastructure dependencies
//! - **Ports**: Trait interfaces for transports and model backends
//! - **Adapters**: Stdio and streamable HTTP transports, HTTP model backends
//! - **Services**: Registry orchestration and the agent loop
//!
//! # Modules
//!
//! - [`tool_registry`]: Server registration, tool discovery and invocation
//! - [`agent`]: Model backends and the agent policy loop
//! - [`tool_server`]: Demo MCP servers used by the binaries and tests
//! - [`config`]: JSON configuration loading
//! - [`telemetry`]: Tracing subscriber setup

pub mod agent;
pub mod config;
pub mod telemetry;
pub mod tool_registry;
pub mod tool_server;
