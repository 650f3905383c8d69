//! Multi-transport tool registry service.

use super::deadline::{Interrupted, run_bounded};
use super::error::{DiscoveryError, InvocationError, RegistrationError, UnavailableServer};
use super::runtime::{ServerRuntime, SharedSession};
use crate::tool_registry::{
    domain::{
        McpServerName, McpTransport, SchemaViolation, ServerDescriptor, ServerStatus,
        ToolDescriptor, ToolResponse, validate_arguments,
    },
    ports::{McpConnector, TransportError},
};
use futures::future::join_all;
use mockable::Clock;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Request payload for registering an MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterServerRequest {
    /// Unique server name, validated on registration.
    pub name: String,
    /// Transport configuration.
    pub transport: McpTransport,
}

impl RegisterServerRequest {
    /// Creates a registration request.
    #[must_use]
    pub fn new(name: impl Into<String>, transport: McpTransport) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }
}

/// Tunables for [`ToolRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Budget for opening a server and listing its tools.
    pub connect_timeout: Duration,
    /// Default budget for a single tool call.
    pub tool_timeout: Duration,
    /// Maximum number of tool calls in flight across all servers.
    pub max_concurrent_calls: usize,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            tool_timeout: Duration::from_secs(60),
            max_concurrent_calls: 8,
        }
    }
}

/// Per-call options for [`ToolRegistry::invoke`].
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl InvokeOptions {
    /// Creates options using the registry's default tool timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the call by `timeout` measured from dispatch.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bounds the call by an absolute deadline. Takes precedence over
    /// [`Self::with_timeout`].
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Aborts the call when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Outcome of a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTools {
    tools: BTreeMap<String, ToolDescriptor>,
    unavailable: Vec<UnavailableServer>,
}

impl DiscoveredTools {
    /// Returns the aggregated tool mapping.
    #[must_use]
    pub const fn tools(&self) -> &BTreeMap<String, ToolDescriptor> {
        &self.tools
    }

    /// Returns the sorted tool names.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Returns servers omitted from this pass because they failed.
    #[must_use]
    pub fn unavailable(&self) -> &[UnavailableServer] {
        &self.unavailable
    }
}

#[derive(Default)]
struct RegistryState {
    closed: bool,
    servers: BTreeMap<McpServerName, Arc<ServerRuntime>>,
    tools: BTreeMap<String, ToolDescriptor>,
}

/// Aggregates tools from many MCP servers behind one name-keyed mapping.
///
/// Registration is lazy: transports open during [`Self::discover_tools`].
/// The mapping is replaced atomically by each successful discovery and
/// cleared by [`Self::shutdown`].
pub struct ToolRegistry<C, K>
where
    C: McpConnector,
    K: Clock + Send + Sync,
{
    connector: Arc<C>,
    clock: Arc<K>,
    options: RegistryOptions,
    state: RwLock<RegistryState>,
    discovery: Mutex<()>,
    permits: Semaphore,
}

struct CallGuard<'a, K: Clock> {
    runtime: &'a ServerRuntime,
    clock: &'a K,
    finished: bool,
}

impl<K: Clock> CallGuard<'_, K> {
    fn finish(mut self, fatal_reason: Option<&str>) -> Option<SharedSession> {
        self.finished = true;
        self.runtime.end_call(fatal_reason, self.clock)
    }
}

impl<K: Clock> Drop for CallGuard<'_, K> {
    fn drop(&mut self) {
        if !self.finished {
            drop(self.runtime.end_call(None, self.clock));
        }
    }
}

impl<C, K> ToolRegistry<C, K>
where
    C: McpConnector,
    K: Clock + Send + Sync,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new(connector: Arc<C>, clock: Arc<K>, options: RegistryOptions) -> Self {
        let permits = Semaphore::new(options.max_concurrent_calls.max(1));
        Self {
            connector,
            clock,
            options,
            state: RwLock::new(RegistryState::default()),
            discovery: Mutex::new(()),
            permits,
        }
    }

    /// Registers a batch of servers without opening any transport.
    ///
    /// The batch is atomic: when any request fails validation nothing is
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] for invalid names, malformed transport
    /// parameters, duplicate names, or a closed registry.
    pub async fn register(
        &self,
        requests: impl IntoIterator<Item = RegisterServerRequest> + Send,
    ) -> Result<(), RegistrationError> {
        let mut batch = Vec::new();
        let mut seen = HashSet::new();
        for request in requests {
            let descriptor = validate_request(request)?;
            if !seen.insert(descriptor.name().clone()) {
                return Err(RegistrationError::DuplicateName(descriptor.name().clone()));
            }
            batch.push(descriptor);
        }

        let mut state = self.state.write().await;
        if state.closed {
            return Err(RegistrationError::RegistryClosed);
        }
        if let Some(existing) = batch
            .iter()
            .find(|descriptor| state.servers.contains_key(descriptor.name()))
        {
            return Err(RegistrationError::DuplicateName(existing.name().clone()));
        }

        for descriptor in batch {
            info!(
                server = %descriptor.name(),
                transport = %descriptor.transport().kind(),
                "registered MCP server"
            );
            let runtime = Arc::new(ServerRuntime::new(descriptor, &*self.clock));
            state
                .servers
                .insert(runtime.descriptor().name().clone(), runtime);
        }
        Ok(())
    }

    /// Connects every registered server and rebuilds the tool mapping.
    ///
    /// # Errors
    ///
    /// See [`Self::discover_tools_with`].
    pub async fn discover_tools(&self) -> Result<DiscoveredTools, DiscoveryError> {
        self.discover_tools_inner(None).await
    }

    /// Connects every registered server and rebuilds the tool mapping,
    /// aborting when `cancellation` fires.
    ///
    /// Servers are contacted concurrently. A server that cannot be reached is
    /// omitted and reported in [`DiscoveredTools::unavailable`]. The mapping
    /// is left unchanged when this returns an error.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NameCollision`] when two servers expose the
    /// same tool name, [`DiscoveryError::TransportUnavailable`] or
    /// [`DiscoveryError::AllServersUnavailable`] when every server fails,
    /// [`DiscoveryError::Cancelled`] on cancellation,
    /// [`DiscoveryError::NoServersRegistered`] for an empty registry, and
    /// [`DiscoveryError::RegistryClosed`] after shutdown.
    pub async fn discover_tools_with(
        &self,
        cancellation: &CancellationToken,
    ) -> Result<DiscoveredTools, DiscoveryError> {
        self.discover_tools_inner(Some(cancellation)).await
    }

    async fn discover_tools_inner(
        &self,
        cancellation: Option<&CancellationToken>,
    ) -> Result<DiscoveredTools, DiscoveryError> {
        let _serialized = self.discovery.lock().await;
        let servers: Vec<Arc<ServerRuntime>> = {
            let state = self.state.read().await;
            if state.closed {
                return Err(DiscoveryError::RegistryClosed);
            }
            state.servers.values().cloned().collect()
        };
        if servers.is_empty() {
            return Err(DiscoveryError::NoServersRegistered);
        }

        let deadline = Instant::now() + self.options.connect_timeout;
        let outcomes = join_all(
            servers
                .iter()
                .map(|runtime| self.list_server(runtime, deadline, cancellation)),
        )
        .await;

        if cancellation.is_some_and(CancellationToken::is_cancelled) {
            return Err(DiscoveryError::Cancelled);
        }

        let mut tools: BTreeMap<String, ToolDescriptor> = BTreeMap::new();
        let mut unavailable = Vec::new();
        let mut reachable = 0_usize;
        for (runtime, outcome) in servers.iter().zip(outcomes) {
            let server = runtime.descriptor().name();
            match outcome {
                Ok(listed) => {
                    reachable += 1;
                    for tool in listed {
                        if let Some(existing) = tools.get(tool.name()) {
                            return Err(DiscoveryError::NameCollision {
                                tool: tool.name().to_owned(),
                                first_server: existing.server().clone(),
                                second_server: server.clone(),
                            });
                        }
                        tools.insert(tool.name().to_owned(), tool);
                    }
                }
                Err(reason) => {
                    warn!(server = %server, reason = %reason, "MCP server unavailable; omitting its tools");
                    unavailable.push(UnavailableServer {
                        server: server.clone(),
                        reason,
                    });
                }
            }
        }

        if reachable == 0 {
            return Err(all_unavailable(unavailable));
        }

        let mut state = self.state.write().await;
        if state.closed {
            return Err(DiscoveryError::RegistryClosed);
        }
        state.tools.clone_from(&tools);
        info!(
            tools = tools.len(),
            servers = reachable,
            unavailable = unavailable.len(),
            "tool discovery complete"
        );
        Ok(DiscoveredTools { tools, unavailable })
    }

    async fn list_server(
        &self,
        runtime: &ServerRuntime,
        deadline: Instant,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Vec<ToolDescriptor>, String> {
        let server = runtime.descriptor().name();
        let session = match runtime.ready_session() {
            Some(session) => session,
            None => self.connect_server(runtime, deadline, cancellation).await?,
        };

        let failure = match run_bounded(deadline, cancellation, session.list_tools()).await {
            Ok(Ok(tools)) => {
                debug!(server = %server, tools = tools.len(), "listed MCP tools");
                return Ok(tools);
            }
            Ok(Err(err)) => err.to_string(),
            Err(Interrupted::TimedOut) => format!(
                "tools/list timed out after {:?}",
                self.options.connect_timeout
            ),
            Err(Interrupted::Cancelled) => {
                debug!(server = %server, "tools/list abandoned; session kept");
                return Err("discovery cancelled".to_owned());
            }
        };

        if let Some(stale) = runtime.failed(&failure, &*self.clock) {
            stale.close().await;
        }
        Err(failure)
    }

    async fn connect_server(
        &self,
        runtime: &ServerRuntime,
        deadline: Instant,
        cancellation: Option<&CancellationToken>,
    ) -> Result<SharedSession, String> {
        if !runtime.begin_connect(&*self.clock) {
            return Err(format!("server is {}", runtime.status().state()));
        }

        let connected = run_bounded(
            deadline,
            cancellation,
            self.connector.connect(runtime.descriptor()),
        )
        .await;
        let failure = match connected {
            Ok(Ok(session)) => {
                return match runtime.connected(Arc::clone(&session), &*self.clock) {
                    Ok(()) => Ok(session),
                    Err(orphan) => {
                        orphan.close().await;
                        Err("registry shut down while connecting".to_owned())
                    }
                };
            }
            Ok(Err(err)) => err.to_string(),
            Err(Interrupted::TimedOut) => format!(
                "connection timed out after {:?}",
                self.options.connect_timeout
            ),
            Err(Interrupted::Cancelled) => "discovery cancelled".to_owned(),
        };

        drop(runtime.failed(&failure, &*self.clock));
        Err(failure)
    }

    /// Invokes a discovered tool.
    ///
    /// Unknown names and schema violations are rejected before any transport
    /// is touched. `arguments` may be `null`, which is treated as an empty
    /// object.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError`] describing why the call did not produce a
    /// tool response. A response with `is_error` set is still `Ok`.
    pub async fn invoke(
        &self,
        tool_name: &str,
        arguments: Value,
        options: InvokeOptions,
    ) -> Result<ToolResponse, InvocationError> {
        let (tool, runtime) = self.lookup(tool_name).await?;
        let argument_map = check_arguments(&tool, arguments)?;

        let timeout = options.timeout.unwrap_or(self.options.tool_timeout);
        let deadline = options
            .deadline
            .unwrap_or_else(|| Instant::now() + timeout);
        let budget = deadline.saturating_duration_since(Instant::now());
        let cancellation = options.cancellation.as_ref();
        let interrupted = |reason: Interrupted| match reason {
            Interrupted::TimedOut => InvocationError::Timeout {
                tool: tool_name.to_owned(),
                after: budget,
            },
            Interrupted::Cancelled => InvocationError::Cancelled {
                tool: tool_name.to_owned(),
            },
        };

        let _permit = run_bounded(deadline, cancellation, self.permits.acquire())
            .await
            .map_err(interrupted)?
            .map_err(|_| InvocationError::RegistryClosed)?;

        let server = tool.server().clone();
        let session = runtime
            .begin_call(&*self.clock)
            .map_err(|state| InvocationError::ServerUnavailable {
                server: server.clone(),
                state,
            })?;
        let guard = CallGuard {
            runtime: &runtime,
            clock: &*self.clock,
            finished: false,
        };

        debug!(tool = tool_name, server = %server, "invoking MCP tool");
        let outcome = run_bounded(
            deadline,
            cancellation,
            session.call_tool(tool.name(), argument_map),
        )
        .await;

        match outcome {
            Ok(Ok(response)) => {
                drop(guard.finish(None));
                debug!(tool = tool_name, is_error = response.is_error, "MCP tool returned");
                Ok(response)
            }
            Ok(Err(err)) => {
                let fatal_reason = err.is_fatal().then(|| err.to_string());
                if let Some(broken) = guard.finish(fatal_reason.as_deref()) {
                    warn!(server = %server, error = %err, "MCP session failed during tool call");
                    broken.close().await;
                }
                Err(self.call_failure(tool_name, server, err).await)
            }
            Err(reason) => {
                drop(guard.finish(None));
                debug!(tool = tool_name, ?reason, "MCP tool call interrupted");
                Err(interrupted(reason))
            }
        }
    }

    async fn lookup(
        &self,
        tool_name: &str,
    ) -> Result<(ToolDescriptor, Arc<ServerRuntime>), InvocationError> {
        let state = self.state.read().await;
        if state.closed {
            return Err(InvocationError::RegistryClosed);
        }
        let tool = state
            .tools
            .get(tool_name)
            .cloned()
            .ok_or_else(|| InvocationError::UnknownTool(tool_name.to_owned()))?;
        let runtime = state.servers.get(tool.server()).cloned().ok_or_else(|| {
            InvocationError::UnknownTool(tool_name.to_owned())
        })?;
        Ok((tool, runtime))
    }

    async fn call_failure(
        &self,
        tool_name: &str,
        server: McpServerName,
        source: TransportError,
    ) -> InvocationError {
        if self.state.read().await.closed {
            return InvocationError::RegistryClosed;
        }
        InvocationError::TransportError {
            tool: tool_name.to_owned(),
            server,
            source,
        }
    }

    /// Closes every session and marks the registry closed.
    ///
    /// Safe to call repeatedly and from any state. Each session close is
    /// bounded by the transport's shutdown grace period.
    pub async fn shutdown(&self) {
        let runtimes: Vec<Arc<ServerRuntime>> = {
            let mut state = self.state.write().await;
            if state.closed {
                return;
            }
            state.closed = true;
            state.tools.clear();
            state.servers.values().cloned().collect()
        };
        self.permits.close();

        join_all(runtimes.iter().map(|runtime| async move {
            if let Some(session) = runtime.begin_close(&*self.clock) {
                session.close().await;
            }
            runtime.mark_closed(&*self.clock);
            debug!(server = %runtime.descriptor().name(), "MCP server closed");
        }))
        .await;
        info!(servers = runtimes.len(), "tool registry shut down");
    }

    /// Returns a snapshot of the discovered tools, sorted by name.
    pub async fn tools(&self) -> Vec<ToolDescriptor> {
        self.state.read().await.tools.values().cloned().collect()
    }

    /// Returns the status of a registered server.
    pub async fn server_status(&self, server: &str) -> Option<ServerStatus> {
        let name = McpServerName::new(server).ok()?;
        let state = self.state.read().await;
        state.servers.get(&name).map(|runtime| runtime.status())
    }

    /// Returns the registered server names, sorted.
    pub async fn server_names(&self) -> Vec<McpServerName> {
        self.state.read().await.servers.keys().cloned().collect()
    }

    /// Returns whether [`Self::shutdown`] has run.
    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }
}

fn validate_request(request: RegisterServerRequest) -> Result<ServerDescriptor, RegistrationError> {
    let name = McpServerName::new(request.name.as_str()).map_err(|source| {
        RegistrationError::InvalidServerName {
            name: request.name.clone(),
            source,
        }
    })?;
    ServerDescriptor::new(name, request.transport).map_err(|err| {
        RegistrationError::InvalidTransportConfig {
            server: request.name,
            reason: err.to_string(),
        }
    })
}

fn check_arguments(
    tool: &ToolDescriptor,
    arguments: Value,
) -> Result<Map<String, Value>, InvocationError> {
    let mismatch = |violation| InvocationError::SchemaMismatch {
        tool: tool.name().to_owned(),
        violation,
    };
    let normalized = if arguments.is_null() {
        Value::Object(Map::new())
    } else {
        arguments
    };
    validate_arguments(tool.input_schema(), &normalized).map_err(mismatch)?;
    match normalized {
        Value::Object(map) => Ok(map),
        _ => Err(mismatch(SchemaViolation::new(
            "$",
            "tool arguments must be a JSON object",
        ))),
    }
}

fn all_unavailable(mut unavailable: Vec<UnavailableServer>) -> DiscoveryError {
    if unavailable.len() == 1
        && let Some(only) = unavailable.pop()
    {
        return DiscoveryError::TransportUnavailable {
            server: only.server,
            reason: only.reason,
        };
    }
    DiscoveryError::AllServersUnavailable(unavailable)
}
