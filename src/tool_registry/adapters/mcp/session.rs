//! MCP session backed by a running `rmcp` client service.

use crate::tool_registry::domain::{McpServerName, ToolDescriptor, ToolResponse};
use crate::tool_registry::ports::{McpSession, TransportError, TransportResult};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult, ClientInfo, PaginatedRequestParam, Tool};
use rmcp::service::{Peer, RunningService};
use rmcp::{RoleClient, ServiceError};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Upper bound on `tools/list` pages followed in one listing.
pub(crate) const MAX_LIST_PAGES: usize = 64;

/// The client half of an initialized MCP connection.
pub(crate) struct RmcpSession {
    server: McpServerName,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
    shutdown_grace: Duration,
}

impl RmcpSession {
    pub(crate) fn new(
        server: McpServerName,
        service: RunningService<RoleClient, ClientInfo>,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            server,
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            shutdown_grace,
        }
    }
}

#[async_trait]
impl McpSession for RmcpSession {
    async fn list_tools(&self) -> TransportResult<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut seen_cursors = HashSet::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let page = self
                .peer
                .list_tools(Some(PaginatedRequestParam {
                    cursor: cursor.clone(),
                }))
                .await
                .map_err(transport_error)?;
            for tool in page.tools {
                tools.push(tool_descriptor(&self.server, tool)?);
            }

            match page.next_cursor.filter(|next| !next.is_empty()) {
                None => return Ok(tools),
                Some(next) if !seen_cursors.insert(next.clone()) => {
                    return Err(TransportError::Protocol(format!(
                        "tools/list repeated cursor '{next}'"
                    )));
                }
                Some(next) => cursor = Some(next),
            }
        }

        Err(TransportError::Protocol(format!(
            "tools/list exceeded {MAX_LIST_PAGES} pages"
        )))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> TransportResult<ToolResponse> {
        let result = self
            .peer
            .call_tool(CallToolRequestParam {
                name: Cow::Owned(name.to_owned()),
                arguments: Some(arguments),
            })
            .await
            .map_err(transport_error)?;
        tool_response(&result)
    }

    async fn close(&self) {
        let Some(service) = self.service.lock().await.take() else {
            return;
        };
        match tokio::time::timeout(self.shutdown_grace, service.cancel()).await {
            Ok(Ok(reason)) => debug!(server = %self.server, ?reason, "MCP session closed"),
            Ok(Err(err)) => {
                warn!(server = %self.server, error = %err, "MCP session task ended abnormally");
            }
            Err(_) => {
                warn!(
                    server = %self.server,
                    grace = ?self.shutdown_grace,
                    "MCP session did not close in time; dropping it"
                );
            }
        }
    }
}

pub(crate) fn tool_descriptor(server: &McpServerName, tool: Tool) -> TransportResult<ToolDescriptor> {
    ToolDescriptor::new(
        tool.name.into_owned(),
        tool.description.map(Cow::into_owned),
        Value::Object(Arc::unwrap_or_clone(tool.input_schema)),
        server.clone(),
    )
    .map_err(|err| TransportError::Protocol(err.to_string()))
}

pub(crate) fn tool_response(result: &CallToolResult) -> TransportResult<ToolResponse> {
    Ok(serde_json::from_value(serde_json::to_value(result)?)?)
}

/// Maps `rmcp` request failures onto the transport error taxonomy.
///
/// Errors answered by the server keep the session usable; a dead or
/// unwritable transport is fatal.
pub(crate) fn transport_error(err: ServiceError) -> TransportError {
    match err {
        ServiceError::McpError(data) => TransportError::Rpc {
            code: i64::from(data.code.0),
            message: data.message.into_owned(),
        },
        ServiceError::TransportClosed => TransportError::Closed,
        ServiceError::TransportSend(source) => {
            TransportError::from(std::io::Error::other(source.to_string()))
        }
        other => TransportError::Protocol(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::{Content, ErrorCode};
    use rmcp::ErrorData;
    use serde_json::json;

    fn server() -> McpServerName {
        McpServerName::new("math").expect("valid name")
    }

    #[test]
    fn converts_tools_with_their_server() {
        let schema = json!({"type": "object", "properties": {"a": {"type": "integer"}}});
        let Value::Object(schema_object) = schema.clone() else {
            panic!("schema should be an object");
        };
        let tool = Tool::new("add", "Add two numbers", Arc::new(schema_object));

        let descriptor = tool_descriptor(&server(), tool).expect("tool should convert");

        assert_eq!(descriptor.name(), "add");
        assert_eq!(descriptor.description(), Some("Add two numbers"));
        assert_eq!(descriptor.input_schema(), &schema);
        assert_eq!(descriptor.server().as_str(), "math");
    }

    #[test]
    fn converts_call_results() {
        let response = tool_response(&CallToolResult::success(vec![Content::text("8")]))
            .expect("result should convert");
        assert!(!response.is_error);
        assert_eq!(response.text(), "8");

        let failure = tool_response(&CallToolResult::error(vec![Content::text("nope")]))
            .expect("result should convert");
        assert!(failure.is_error);
    }

    #[test]
    fn server_errors_leave_the_session_usable() {
        let err = transport_error(ServiceError::McpError(ErrorData::new(
            ErrorCode::INVALID_PARAMS,
            "bad arguments",
            None,
        )));
        assert!(matches!(
            &err,
            TransportError::Rpc { code: -32_602, message } if message == "bad arguments"
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn closed_transport_is_fatal() {
        assert!(transport_error(ServiceError::TransportClosed).is_fatal());
        assert!(!transport_error(ServiceError::UnexpectedResponse).is_fatal());
    }
}
