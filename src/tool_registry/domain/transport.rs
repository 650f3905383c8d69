//! MCP server transport configuration value objects.

use super::ToolRegistryDomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What happens to a child server's standard error stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StderrMode {
    /// Share the client's standard error.
    #[default]
    Inherit,
    /// Send the stream to the null device.
    Discard,
}

/// Transport settings for an MCP server hosted as a child process speaking
/// over its standard input and output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioTransportConfig {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    working_directory: Option<String>,
    #[serde(default)]
    stderr: StderrMode,
}

impl StdioTransportConfig {
    /// Creates a new STDIO transport configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyStdioCommand`] when `command`
    /// is empty after trimming.
    pub fn new(command: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        let normalized_command = command.into().trim().to_owned();
        if normalized_command.is_empty() {
            return Err(ToolRegistryDomainError::EmptyStdioCommand);
        }

        Ok(Self {
            command: normalized_command,
            args: Vec::new(),
            env: BTreeMap::new(),
            working_directory: None,
            stderr: StderrMode::Inherit,
        })
    }

    /// Sets command-line arguments, preserving their order.
    #[must_use]
    pub fn with_args(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.args = values.into_iter().collect();
        self
    }

    /// Replaces process environment overrides.
    #[must_use]
    pub fn with_env(mut self, values: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = values.into_iter().collect();
        self
    }

    /// Chooses what happens to the child's standard error.
    #[must_use]
    pub const fn with_stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }

    /// Sets an explicit working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyWorkingDirectory`] when the
    /// provided value is empty after trimming.
    pub fn with_working_directory(
        mut self,
        value: impl Into<String>,
    ) -> Result<Self, ToolRegistryDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ToolRegistryDomainError::EmptyWorkingDirectory);
        }

        self.working_directory = Some(normalized);
        Ok(self)
    }

    /// Returns the executable command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns command-line arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns environment overrides.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Returns the optional working directory.
    #[must_use]
    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    /// Returns the standard error policy.
    #[must_use]
    pub const fn stderr(&self) -> StderrMode {
        self.stderr
    }

    fn validate(&self) -> Result<(), ToolRegistryDomainError> {
        if self.command.trim().is_empty() {
            return Err(ToolRegistryDomainError::EmptyStdioCommand);
        }
        if self
            .working_directory
            .as_deref()
            .is_some_and(|dir| dir.trim().is_empty())
        {
            return Err(ToolRegistryDomainError::EmptyWorkingDirectory);
        }
        Ok(())
    }
}

/// Transport settings for an MCP server reached over streaming HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamableHttpTransportConfig {
    url: String,
    headers: BTreeMap<String, String>,
}

impl StreamableHttpTransportConfig {
    /// Creates a new streaming HTTP transport configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError`] when `url` is empty or does not
    /// start with `http://` or `https://`.
    pub fn new(url: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        let normalized_url = url.into().trim().to_owned();
        validate_url(&normalized_url)?;
        Ok(Self {
            url: normalized_url,
            headers: BTreeMap::new(),
        })
    }

    /// Sets static headers sent with every request.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidHeaderName`] when a header
    /// name is not a valid HTTP token.
    pub fn with_headers(
        mut self,
        values: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ToolRegistryDomainError> {
        let headers: BTreeMap<String, String> = values.into_iter().collect();
        for name in headers.keys() {
            validate_header_name(name)?;
        }
        self.headers = headers;
        Ok(self)
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the static headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    fn validate(&self) -> Result<(), ToolRegistryDomainError> {
        validate_url(&self.url)?;
        self.headers.keys().try_for_each(|name| validate_header_name(name))
    }
}

fn validate_url(url: &str) -> Result<(), ToolRegistryDomainError> {
    if url.is_empty() {
        return Err(ToolRegistryDomainError::EmptyHttpUrl);
    }
    let has_valid_prefix = url.starts_with("http://") || url.starts_with("https://");
    if !has_valid_prefix {
        return Err(ToolRegistryDomainError::InvalidHttpUrl(url.to_owned()));
    }
    Ok(())
}

fn validate_header_name(name: &str) -> Result<(), ToolRegistryDomainError> {
    let is_token = !name.is_empty()
        && name
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(character));
    if is_token {
        Ok(())
    } else {
        Err(ToolRegistryDomainError::InvalidHeaderName(name.to_owned()))
    }
}

/// Enumerates the supported transport kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// A spawned child process exchanging newline-delimited JSON-RPC.
    StandardIoProcess,
    /// An HTTP endpoint accepting JSON-RPC posts and answering with JSON or
    /// server-sent events.
    StreamingHttp,
}

impl TransportKind {
    /// Returns the canonical configuration representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StandardIoProcess => "standard-io-process",
            Self::StreamingHttp => "streaming-http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TransportKind {
    type Error = ToolRegistryDomainError;

    /// Parses a transport kind, accepting the common aliases used by MCP
    /// client configuration files (`stdio`, `streamable_http`, `http`).
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "standard-io-process" | "stdio" => Ok(Self::StandardIoProcess),
            "streaming-http" | "streamable-http" | "http" => Ok(Self::StreamingHttp),
            _ => Err(ToolRegistryDomainError::UnknownTransportKind(value.to_owned())),
        }
    }
}

/// Supported MCP transport configuration variants.
///
/// Exactly one transport's parameters exist per server by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "config")]
pub enum McpTransport {
    /// MCP over local process STDIO.
    Stdio(StdioTransportConfig),
    /// MCP over streaming HTTP.
    StreamableHttp(StreamableHttpTransportConfig),
}

impl McpTransport {
    /// Creates a `stdio` transport.
    ///
    /// # Errors
    ///
    /// Returns validation errors from [`StdioTransportConfig::new`].
    pub fn stdio(command: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        Ok(Self::Stdio(StdioTransportConfig::new(command)?))
    }

    /// Creates a streaming HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns validation errors from [`StreamableHttpTransportConfig::new`].
    pub fn streamable_http(url: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        Ok(Self::StreamableHttp(StreamableHttpTransportConfig::new(url)?))
    }

    /// Returns the transport kind.
    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio(_) => TransportKind::StandardIoProcess,
            Self::StreamableHttp(_) => TransportKind::StreamingHttp,
        }
    }

    /// Re-checks the transport parameters.
    ///
    /// Values built through the constructors are always valid; this guards
    /// values that arrived through deserialization.
    ///
    /// # Errors
    ///
    /// Returns the first [`ToolRegistryDomainError`] found.
    pub fn validate(&self) -> Result<(), ToolRegistryDomainError> {
        match self {
            Self::Stdio(config) => config.validate(),
            Self::StreamableHttp(config) => config.validate(),
        }
    }
}
