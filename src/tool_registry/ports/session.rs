//! Transport session ports for talking to MCP servers.

use crate::tool_registry::domain::{ServerDescriptor, ToolDescriptor, ToolResponse};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// An initialized MCP session with one server.
///
/// Implementations must tolerate concurrent `call_tool` requests and must
/// stay usable when a caller drops an in-flight future.
#[async_trait]
pub trait McpSession: Send + Sync {
    /// Lists every tool the server exposes, following pagination.
    async fn list_tools(&self) -> TransportResult<Vec<ToolDescriptor>>;

    /// Calls a tool with already-validated arguments.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> TransportResult<ToolResponse>;

    /// Releases the session. Must be safe to call more than once.
    async fn close(&self);
}

/// Opens MCP sessions for server descriptors.
#[async_trait]
pub trait McpConnector: Send + Sync {
    /// Opens the transport and completes the MCP `initialize` handshake.
    async fn connect(&self, server: &ServerDescriptor) -> TransportResult<Arc<dyn McpSession>>;
}

/// Errors returned by transport adapters.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The server process could not be started.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        /// Command that failed to start.
        command: String,
        /// Underlying I/O error.
        source: Arc<std::io::Error>,
    },

    /// Reading from or writing to the transport failed.
    #[error("transport I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// The transport could not be configured from the descriptor.
    #[error("invalid transport configuration: {0}")]
    Configuration(String),

    /// The MCP `initialize` handshake did not complete.
    #[error("MCP handshake failed: {0}")]
    Handshake(String),

    /// The connection closed before a response arrived.
    #[error("transport closed")]
    Closed,

    /// The peer sent a message that violates the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer answered with a JSON-RPC error object.
    #[error("server returned error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// A payload could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),

    /// Generic adapter failure.
    #[error("transport runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps an opaque runtime error.
    #[must_use]
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }

    /// Returns whether the session is unusable after this error.
    ///
    /// Process exit, broken pipes and closed streams are fatal; JSON-RPC
    /// errors returned by the server leave the session usable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Spawn { .. } | Self::Io(_) | Self::Handshake(_) | Self::Closed
        )
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(Arc::new(err))
    }
}
