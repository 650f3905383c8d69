//! Transport-independent MCP server core.

use crate::tool_registry::domain::{ToolResponse, validate_arguments};
use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam,
    ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Metadata advertised for a tool in `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the arguments object.
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Creates a definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    fn to_tool(&self) -> Tool {
        let schema = match &self.input_schema {
            Value::Object(keywords) => keywords.clone(),
            _ => Map::new(),
        };
        Tool::new(self.name.clone(), self.description.clone(), Arc::new(schema))
    }
}

/// A tool hosted by a [`ToolServer`].
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Returns the advertised metadata.
    fn definition(&self) -> &ToolDefinition;

    /// Runs the tool. Arguments have already been checked against the
    /// definition's input schema.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorData`] when the call cannot be answered with a tool
    /// result at all. Domain failures should be reported through
    /// [`ToolResponse::error`] instead.
    async fn call(&self, arguments: Map<String, Value>) -> Result<ToolResponse, ErrorData>;
}

/// [`ToolHandler`] wrapping a synchronous closure.
pub struct FnTool<F> {
    definition: ToolDefinition,
    handler: F,
}

impl<F> FnTool<F>
where
    F: Fn(&Map<String, Value>) -> Result<ToolResponse, ErrorData> + Send + Sync,
{
    /// Creates a tool from its definition and handler.
    #[must_use]
    pub const fn new(definition: ToolDefinition, handler: F) -> Self {
        Self {
            definition,
            handler,
        }
    }
}

#[async_trait]
impl<F> ToolHandler for FnTool<F>
where
    F: Fn(&Map<String, Value>) -> Result<ToolResponse, ErrorData> + Send + Sync,
{
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<ToolResponse, ErrorData> {
        (self.handler)(&arguments)
    }
}

/// An MCP server answering `tools/list` and `tools/call` from a fixed set
/// of tools.
#[derive(Clone)]
pub struct ToolServer {
    name: String,
    version: String,
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
    call_delay: Duration,
}

impl ToolServer {
    /// Creates a server with no tools.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            tools: BTreeMap::new(),
            call_delay: Duration::ZERO,
        }
    }

    /// Adds a tool, replacing any tool with the same name.
    #[must_use]
    pub fn with_tool(mut self, tool: impl ToolHandler + 'static) -> Self {
        self.tools
            .insert(tool.definition().name.clone(), Arc::new(tool));
        self
    }

    /// Delays every `tools/call` answer by `delay`.
    #[must_use]
    pub const fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Returns the server name reported by `initialize`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the hosted tool names, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Validates `arguments` against the named tool's schema and runs it.
    ///
    /// Missing arguments count as an empty object.
    ///
    /// # Errors
    ///
    /// Returns an invalid-params [`ErrorData`] for an unknown tool or
    /// arguments the schema rejects, and whatever the tool itself raises.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<ToolResponse, ErrorData> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ErrorData::invalid_params(format!("unknown tool: {name}"), None))?;

        let argument_map = arguments.unwrap_or_default();
        validate_arguments(
            &tool.definition().input_schema,
            &Value::Object(argument_map.clone()),
        )
        .map_err(|violation| ErrorData::invalid_params(violation.to_string(), None))?;

        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
        let response = tool.call(argument_map).await?;
        debug!(server = %self.name, tool = name, is_error = response.is_error, "tool call answered");
        Ok(response)
    }
}

impl ServerHandler for ToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
                ..Implementation::default()
            },
            instructions: None,
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(
            self.tools
                .values()
                .map(|tool| tool.definition().to_tool())
                .collect(),
        ))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let response = self.call(&request.name, request.arguments).await?;
        serde_json::to_value(response)
            .and_then(serde_json::from_value)
            .map_err(|err| ErrorData::internal_error(err.to_string(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::ServiceExt;
    use rmcp::model::ErrorCode;
    use rmcp::RoleClient;
    use rmcp::service::RunningService;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn echo_server() -> ToolServer {
        let definition = ToolDefinition::new(
            "echo",
            "Echo the given text",
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"],
            }),
        );
        ToolServer::new("echo").with_tool(FnTool::new(definition, |arguments| {
            let text = arguments.get("text").and_then(Value::as_str).unwrap_or_default();
            Ok(ToolResponse::from_text(text))
        }))
    }

    async fn connect(server: ToolServer) -> RunningService<RoleClient, ()> {
        let (server_io, client_io) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let running = server.serve(server_io).await.expect("server handshake");
            running.waiting().await.expect("server task");
        });
        ().serve(client_io).await.expect("client handshake")
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn initialize_reports_name_and_tools_capability(echo_server: ToolServer) {
        let client = connect(echo_server).await;
        let info = client.peer_info().expect("server info");
        assert_eq!(info.server_info.name, "echo");
        assert!(info.capabilities.tools.is_some());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn lists_tools_with_schema(echo_server: ToolServer) {
        let client = connect(echo_server).await;
        let tools = client.list_all_tools().await.expect("list");
        let tool = tools.first().expect("echo tool");
        assert_eq!(tool.name, "echo");
        assert_eq!(tool.input_schema.get("required"), Some(&json!(["text"])));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn calls_tool_over_the_wire(echo_server: ToolServer) {
        let client = connect(echo_server).await;
        let result = client
            .call_tool(CallToolRequestParam {
                name: "echo".into(),
                arguments: Some(object(json!({"text": "hi"}))),
            })
            .await
            .expect("call");
        let response: ToolResponse =
            serde_json::from_value(serde_json::to_value(result).expect("encode")).expect("decode");
        assert_eq!(response.text(), "hi");
        assert!(!response.is_error);
    }

    #[rstest]
    #[case("missing", Some(json!({})))]
    #[case("echo", Some(json!({"text": 3})))]
    #[case("echo", None)]
    #[tokio::test(flavor = "multi_thread")]
    async fn rejects_bad_calls_with_invalid_params(
        echo_server: ToolServer,
        #[case] name: &str,
        #[case] arguments: Option<Value>,
    ) {
        let err = echo_server
            .call(name, arguments.map(object))
            .await
            .expect_err("invalid");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_tool_is_rejected_over_the_wire(echo_server: ToolServer) {
        let client = connect(echo_server).await;
        let err = client
            .call_tool(CallToolRequestParam {
                name: "missing".into(),
                arguments: None,
            })
            .await
            .expect_err("unknown tool");
        assert!(
            matches!(err, rmcp::ServiceError::McpError(ref data) if data.code == ErrorCode::INVALID_PARAMS),
            "unexpected error: {err}"
        );
    }
}
