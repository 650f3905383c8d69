//! In-memory MCP connector for registry tests.

use crate::tool_registry::{
    domain::{McpServerName, ServerDescriptor, ToolDescriptor, ToolResponse},
    ports::{McpConnector, McpSession, TransportError, TransportResult},
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

type ToolHandlerFn = Arc<dyn Fn(&Map<String, Value>) -> ToolResponse + Send + Sync>;

/// A tool served by [`InMemoryConnector`].
#[derive(Clone)]
pub struct InMemoryTool {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: ToolHandlerFn,
    delay: Option<Duration>,
}

impl InMemoryTool {
    /// Creates a tool whose calls are answered by `handler`.
    pub fn new(
        name: impl Into<String>,
        input_schema: Value,
        handler: impl Fn(&Map<String, Value>) -> ToolResponse + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema,
            handler: Arc::new(handler),
            delay: None,
        }
    }

    /// Sets the tool description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Delays every call by `delay` before the handler runs.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl fmt::Debug for InMemoryTool {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InMemoryTool")
            .field("name", &self.name)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// In-memory MCP connector.
///
/// This adapter models MCP sessions without spawning processes or opening
/// sockets. Tool catalogs are read at listing time, so changing a catalog
/// between discoveries is visible to the next `discover_tools`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    state: Arc<RwLock<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    catalogs: HashMap<McpServerName, Vec<InMemoryTool>>,
    unreachable: HashMap<McpServerName, String>,
    broken: HashSet<McpServerName>,
    connects: HashMap<McpServerName, usize>,
    calls: usize,
    closed_sessions: usize,
}

fn lock_error(err: impl fmt::Display) -> TransportError {
    TransportError::runtime(std::io::Error::other(err.to_string()))
}

impl InMemoryConnector {
    /// Creates an empty in-memory connector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates a tool catalog with a server name, replacing any existing
    /// catalog.
    ///
    /// # Errors
    ///
    /// Returns transport runtime errors when lock acquisition fails.
    pub fn set_tool_catalog(
        &self,
        server: McpServerName,
        tools: Vec<InMemoryTool>,
    ) -> TransportResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.catalogs.insert(server, tools);
        Ok(())
    }

    /// Makes connection attempts to `server` fail with `reason`.
    ///
    /// # Errors
    ///
    /// Returns transport runtime errors when lock acquisition fails.
    pub fn set_unreachable(
        &self,
        server: McpServerName,
        reason: impl Into<String>,
    ) -> TransportResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.unreachable.insert(server, reason.into());
        Ok(())
    }

    /// Makes `server` reachable again.
    ///
    /// # Errors
    ///
    /// Returns transport runtime errors when lock acquisition fails.
    pub fn set_reachable(&self, server: &McpServerName) -> TransportResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.unreachable.remove(server);
        state.broken.remove(server);
        Ok(())
    }

    /// Makes every later call on `server`'s sessions fail as if the process
    /// had exited.
    ///
    /// # Errors
    ///
    /// Returns transport runtime errors when lock acquisition fails.
    pub fn break_sessions(&self, server: McpServerName) -> TransportResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.broken.insert(server);
        Ok(())
    }

    /// Returns how many tool calls reached any session.
    ///
    /// # Errors
    ///
    /// Returns transport runtime errors when lock acquisition fails.
    pub fn call_count(&self) -> TransportResult<usize> {
        Ok(self.state.read().map_err(lock_error)?.calls)
    }

    /// Returns how many connection attempts were made for `server`.
    ///
    /// # Errors
    ///
    /// Returns transport runtime errors when lock acquisition fails.
    pub fn connect_count(&self, server: &McpServerName) -> TransportResult<usize> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.connects.get(server).copied().unwrap_or_default())
    }

    /// Returns how many sessions have been closed.
    ///
    /// # Errors
    ///
    /// Returns transport runtime errors when lock acquisition fails.
    pub fn closed_session_count(&self) -> TransportResult<usize> {
        Ok(self.state.read().map_err(lock_error)?.closed_sessions)
    }
}

#[async_trait]
impl McpConnector for InMemoryConnector {
    async fn connect(&self, server: &ServerDescriptor) -> TransportResult<Arc<dyn McpSession>> {
        let mut state = self.state.write().map_err(lock_error)?;
        *state.connects.entry(server.name().clone()).or_default() += 1;

        if let Some(reason) = state.unreachable.get(server.name()) {
            return Err(TransportError::Io(Arc::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                reason.clone(),
            ))));
        }

        Ok(Arc::new(InMemorySession {
            server: server.name().clone(),
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }
}

struct InMemorySession {
    server: McpServerName,
    state: Arc<RwLock<InMemoryState>>,
    closed: AtomicBool,
}

impl InMemorySession {
    fn ensure_open(&self) -> TransportResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let state = self.state.read().map_err(lock_error)?;
        if state.broken.contains(&self.server) {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl McpSession for InMemorySession {
    async fn list_tools(&self) -> TransportResult<Vec<ToolDescriptor>> {
        self.ensure_open()?;
        let state = self.state.read().map_err(lock_error)?;
        state
            .catalogs
            .get(&self.server)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|tool| {
                ToolDescriptor::new(
                    tool.name.clone(),
                    tool.description.clone(),
                    tool.input_schema.clone(),
                    self.server.clone(),
                )
                .map_err(|err| TransportError::Protocol(err.to_string()))
            })
            .collect()
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> TransportResult<ToolResponse> {
        self.ensure_open()?;
        let tool = {
            let mut state = self.state.write().map_err(lock_error)?;
            state.calls += 1;
            state
                .catalogs
                .get(&self.server)
                .and_then(|tools| tools.iter().find(|tool| tool.name == name))
                .cloned()
        };

        let Some(found) = tool else {
            return Err(TransportError::Rpc {
                code: i64::from(rmcp::model::ErrorCode::INVALID_PARAMS.0),
                message: format!("unknown tool: {name}"),
            });
        };

        if let Some(delay) = found.delay {
            tokio::time::sleep(delay).await;
        }
        self.ensure_open()?;
        Ok((found.handler)(&arguments))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut state) = self.state.write() {
            state.closed_sessions += 1;
        }
    }
}
