//! Error types for tool registry domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing tool registry domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolRegistryDomainError {
    /// The server name is empty after trimming.
    #[error("MCP server name must not be empty")]
    EmptyServerName,

    /// The server name contains characters outside `[a-z0-9_-]`.
    #[error(
        "MCP server name '{0}' contains invalid characters (only lowercase alphanumeric, hyphens and underscores allowed)"
    )]
    InvalidServerName(String),

    /// The server name exceeds the 100-character limit.
    #[error("MCP server name exceeds 100 character limit: {0}")]
    ServerNameTooLong(String),

    /// The STDIO command is empty.
    #[error("STDIO command must not be empty")]
    EmptyStdioCommand,

    /// The STDIO working directory is empty after trimming.
    #[error("STDIO working directory must not be empty when provided")]
    EmptyWorkingDirectory,

    /// The streaming HTTP endpoint URL is empty.
    #[error("streaming HTTP URL must not be empty")]
    EmptyHttpUrl,

    /// The streaming HTTP endpoint URL does not have an `http://` or
    /// `https://` prefix.
    #[error("streaming HTTP URL '{0}' must start with 'http://' or 'https://'")]
    InvalidHttpUrl(String),

    /// A static HTTP header name is empty or contains characters that are not
    /// valid in a header token.
    #[error("invalid HTTP header name '{0}'")]
    InvalidHeaderName(String),

    /// The configured transport kind is not recognised.
    #[error(
        "unknown transport '{0}' (expected 'standard-io-process' or 'streaming-http')"
    )]
    UnknownTransportKind(String),

    /// A tool definition name is empty after trimming.
    #[error("tool name must not be empty")]
    EmptyToolName,

    /// Transitioning between two transport states is invalid.
    #[error("invalid transport state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current transport state.
        from: String,
        /// Requested target transport state.
        to: String,
    },
}
