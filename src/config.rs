//! JSON configuration for the `toolbridge` binary.
//!
//! The document is either a bare map from server name to transport
//! parameters, or an object with a `servers` map plus optional `registry`
//! and `model` sections:
//!
//! ```json
//! {
//!   "servers": {
//!     "math": { "command": "math_server", "args": [], "transport": "stdio" },
//!     "weather": { "url": "http://127.0.0.1:8000/mcp", "transport": "streamable_http" }
//!   },
//!   "registry": { "tool_timeout_secs": 30 },
//!   "model": { "model": "qwen-qwq-32b", "api_key_env": "GROQ_API_KEY" }
//! }
//! ```

use crate::agent::adapters::DEFAULT_API_BASE;
use crate::agent::services::DEFAULT_MAX_ITERATIONS;
use crate::tool_registry::adapters::mcp::DEFAULT_SHUTDOWN_GRACE;
use crate::tool_registry::domain::{
    McpTransport, StderrMode, StdioTransportConfig, StreamableHttpTransportConfig, TransportKind,
};
use crate::tool_registry::services::{RegisterServerRequest, RegistrationError, RegistryOptions};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default environment variable holding the model API key.
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Older variable name consulted when [`DEFAULT_API_KEY_ENV`] is unset.
pub const LEGACY_API_KEY_ENV: &str = "GROQ_API";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "qwen-qwq-32b";

const SECTION_KEYS: [&str; 3] = ["servers", "registry", "model"];

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid JSON or a section has the wrong shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A server entry is invalid.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    /// The model API key variable is unset or empty.
    #[error("environment variable '{0}' holding the model API key is not set")]
    MissingCredential(String),
}

/// Registry and transport tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Budget for connecting to a server and listing its tools.
    pub connect_timeout: Duration,
    /// Default budget for one tool call.
    pub tool_timeout: Duration,
    /// Time a closing transport is given before it is forced down.
    pub shutdown_grace: Duration,
    /// Maximum number of tool calls in flight.
    pub max_concurrent_calls: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        let options = RegistryOptions::default();
        Self {
            connect_timeout: options.connect_timeout,
            tool_timeout: options.tool_timeout,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            max_concurrent_calls: options.max_concurrent_calls,
        }
    }
}

impl RegistrySettings {
    /// Returns the registry options these settings describe.
    #[must_use]
    pub const fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            connect_timeout: self.connect_timeout,
            tool_timeout: self.tool_timeout,
            max_concurrent_calls: self.max_concurrent_calls,
        }
    }
}

/// Language model backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Model identifier.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Cap on model turns per query.
    pub max_iterations: usize,
    /// Optional system prompt.
    pub system_prompt: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            api_key_env: DEFAULT_API_KEY_ENV.to_owned(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: None,
        }
    }
}

impl ModelSettings {
    /// Resolves the API key through `lookup`.
    ///
    /// Empty values count as unset. When the default variable is configured
    /// and unset, [`LEGACY_API_KEY_ENV`] is consulted as well.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] naming the configured
    /// variable when no key is found.
    pub fn api_key(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        present(&self.api_key_env)
            .or_else(|| {
                (self.api_key_env == DEFAULT_API_KEY_ENV)
                    .then(|| present(LEGACY_API_KEY_ENV))
                    .flatten()
            })
            .ok_or_else(|| ConfigError::MissingCredential(self.api_key_env.clone()))
    }

    /// Resolves the API key from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Self::api_key`].
    pub fn api_key_from_env(&self) -> Result<String, ConfigError> {
        self.api_key(|name| std::env::var(name).ok())
    }
}

/// Fully validated configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolbridgeConfig {
    /// Servers to register, sorted by name.
    pub servers: Vec<RegisterServerRequest>,
    /// Registry tunables.
    pub registry: RegistrySettings,
    /// Model backend settings.
    pub model: ModelSettings,
}

impl ToolbridgeConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// the errors of [`Self::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file_path = path.as_ref();
        let text = std::fs::read_to_string(file_path).map_err(|source| ConfigError::Read {
            path: file_path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or sections, and
    /// [`ConfigError::Registration`] with
    /// [`RegistrationError::InvalidTransportConfig`] for an unrecognized
    /// transport or missing or extra server parameters.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let document: Map<String, Value> = serde_json::from_str(text)?;
        if !is_sectioned(&document) {
            return Ok(Self {
                servers: parse_servers(document)?,
                ..Self::default()
            });
        }

        let mut sections = document;
        let servers = match sections.remove("servers") {
            Some(value) => parse_servers(serde_json::from_value(value)?)?,
            None => Vec::new(),
        };
        let registry = section::<RawRegistrySettings>(&mut sections, "registry")?.into();
        let model = section::<RawModelSettings>(&mut sections, "model")?.into();
        Ok(Self {
            servers,
            registry,
            model,
        })
    }
}

/// A document is sectioned when it has a `servers` object and no keys
/// other than the known sections.
fn is_sectioned(document: &Map<String, Value>) -> bool {
    document.get("servers").is_some_and(Value::is_object)
        && document.keys().all(|key| SECTION_KEYS.contains(&key.as_str()))
}

fn section<T: DeserializeOwned + Default>(
    sections: &mut Map<String, Value>,
    key: &str,
) -> Result<T, ConfigError> {
    match sections.remove(key) {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(T::default()),
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStdioServer {
    #[serde(rename = "transport")]
    _transport: String,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    stderr: StderrMode,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHttpServer {
    #[serde(rename = "transport")]
    _transport: String,
    url: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

fn parse_servers(entries: Map<String, Value>) -> Result<Vec<RegisterServerRequest>, ConfigError> {
    entries
        .into_iter()
        .map(|(name, entry)| {
            let transport = parse_transport(&name, entry)?;
            Ok(RegisterServerRequest::new(name, transport))
        })
        .collect()
}

fn parse_transport(server: &str, entry: Value) -> Result<McpTransport, RegistrationError> {
    let invalid = |reason: String| RegistrationError::InvalidTransportConfig {
        server: server.to_owned(),
        reason,
    };

    let kind_label = entry
        .get("transport")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing string field `transport`".to_owned()))?;
    let kind = TransportKind::try_from(kind_label).map_err(|err| invalid(err.to_string()))?;

    match kind {
        TransportKind::StandardIoProcess => {
            let raw: RawStdioServer =
                serde_json::from_value(entry).map_err(|err| invalid(err.to_string()))?;
            let mut config = StdioTransportConfig::new(raw.command)
                .map_err(|err| invalid(err.to_string()))?
                .with_args(raw.args)
                .with_env(raw.env)
                .with_stderr(raw.stderr);
            if let Some(cwd) = raw.cwd {
                config = config
                    .with_working_directory(cwd)
                    .map_err(|err| invalid(err.to_string()))?;
            }
            Ok(McpTransport::Stdio(config))
        }
        TransportKind::StreamingHttp => {
            let raw: RawHttpServer =
                serde_json::from_value(entry).map_err(|err| invalid(err.to_string()))?;
            let config = StreamableHttpTransportConfig::new(raw.url)
                .and_then(|config| config.with_headers(raw.headers))
                .map_err(|err| invalid(err.to_string()))?;
            Ok(McpTransport::StreamableHttp(config))
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawRegistrySettings {
    connect_timeout_secs: u64,
    tool_timeout_secs: u64,
    shutdown_grace_secs: u64,
    max_concurrent_calls: usize,
}

impl Default for RawRegistrySettings {
    fn default() -> Self {
        let defaults = RegistrySettings::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            tool_timeout_secs: defaults.tool_timeout.as_secs(),
            shutdown_grace_secs: defaults.shutdown_grace.as_secs(),
            max_concurrent_calls: defaults.max_concurrent_calls,
        }
    }
}

impl From<RawRegistrySettings> for RegistrySettings {
    fn from(raw: RawRegistrySettings) -> Self {
        Self {
            connect_timeout: Duration::from_secs(raw.connect_timeout_secs),
            tool_timeout: Duration::from_secs(raw.tool_timeout_secs),
            shutdown_grace: Duration::from_secs(raw.shutdown_grace_secs),
            max_concurrent_calls: raw.max_concurrent_calls.max(1),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawModelSettings {
    api_base: String,
    model: String,
    api_key_env: String,
    max_iterations: usize,
    system_prompt: Option<String>,
}

impl Default for RawModelSettings {
    fn default() -> Self {
        let defaults = ModelSettings::default();
        Self {
            api_base: defaults.api_base,
            model: defaults.model,
            api_key_env: defaults.api_key_env,
            max_iterations: defaults.max_iterations,
            system_prompt: defaults.system_prompt,
        }
    }
}

impl From<RawModelSettings> for ModelSettings {
    fn from(raw: RawModelSettings) -> Self {
        Self {
            api_base: raw.api_base,
            model: raw.model,
            api_key_env: raw.api_key_env,
            max_iterations: raw.max_iterations.max(1),
            system_prompt: raw.system_prompt.filter(|prompt| !prompt.trim().is_empty()),
        }
    }
}
