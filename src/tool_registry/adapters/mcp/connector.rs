//! Connector that opens real MCP sessions for each transport kind.

use super::session::RmcpSession;
use crate::tool_registry::domain::{
    McpTransport, ServerDescriptor, StderrMode, StdioTransportConfig,
    StreamableHttpTransportConfig,
};
use crate::tool_registry::ports::{McpConnector, McpSession, TransportError, TransportResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::ServiceExt;
use rmcp::model::{ClientCapabilities, ClientInfo, Implementation, ProtocolVersion};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Default time a server gets to exit or acknowledge session teardown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Opens stdio and streamable HTTP MCP sessions.
#[derive(Debug, Clone)]
pub struct TransportConnector {
    shutdown_grace: Duration,
}

impl TransportConnector {
    /// Creates a connector with the default shutdown grace period.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Sets how long `close` waits for a server before forcing teardown.
    #[must_use]
    pub const fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

impl Default for TransportConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpConnector for TransportConnector {
    async fn connect(&self, server: &ServerDescriptor) -> TransportResult<Arc<dyn McpSession>> {
        let name = server.name().clone();
        info!(
            server = %name,
            transport = %server.transport().kind(),
            "connecting to MCP server"
        );

        let handshake = match server.transport() {
            McpTransport::Stdio(config) => client_info().serve(child_process(config)?).await,
            McpTransport::StreamableHttp(config) => {
                client_info().serve(http_transport(config)?).await
            }
        };
        let service = handshake.map_err(|err| TransportError::Handshake(err.to_string()))?;
        debug!(
            server = %name,
            peer = ?service.peer_info().map(|info| &info.server_info.name),
            "MCP session initialized"
        );
        Ok(Arc::new(RmcpSession::new(name, service, self.shutdown_grace)))
    }
}

fn client_info() -> ClientInfo {
    ClientInfo {
        protocol_version: ProtocolVersion::V_2025_03_26,
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            ..Implementation::default()
        },
    }
}

fn child_process(config: &StdioTransportConfig) -> TransportResult<TokioChildProcess> {
    let command = Command::new(config.command()).configure(|cmd| {
        cmd.args(config.args()).envs(config.env()).kill_on_drop(true);
        if let Some(directory) = config.working_directory() {
            cmd.current_dir(directory);
        }
    });
    let stderr = match config.stderr() {
        StderrMode::Inherit => Stdio::inherit(),
        StderrMode::Discard => Stdio::null(),
    };
    let (process, _stderr) = TokioChildProcess::builder(command)
        .stderr(stderr)
        .spawn()
        .map_err(|source| TransportError::Spawn {
            command: config.command().to_owned(),
            source: Arc::new(source),
        })?;
    Ok(process)
}

fn http_transport(
    config: &StreamableHttpTransportConfig,
) -> TransportResult<StreamableHttpClientTransport<reqwest::Client>> {
    let client = reqwest::Client::builder()
        .default_headers(static_headers(config)?)
        .build()
        .map_err(TransportError::runtime)?;
    Ok(StreamableHttpClientTransport::with_client(
        client,
        StreamableHttpClientTransportConfig {
            uri: config.url().to_owned().into(),
            ..Default::default()
        },
    ))
}

fn static_headers(config: &StreamableHttpTransportConfig) -> TransportResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in config.headers() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| TransportError::Configuration(format!("header '{name}': {err}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|err| TransportError::Configuration(format!("header '{name}': {err}")))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
