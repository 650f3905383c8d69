//! Streamable HTTP serving for a [`ToolServer`].
//!
//! Requests are `POST`ed to [`MCP_PATH`] and answered as event streams. In
//! stateful mode `initialize` opens a session whose id is returned in the
//! `mcp-session-id` header; later messages must echo it and `DELETE` ends
//! the session.

use super::handler::ToolServer;
use axum::Router;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use std::future::Future;
use std::io;
use tokio::net::TcpListener;
use tracing::info;

/// Path the router serves.
pub const MCP_PATH: &str = "/mcp";

/// Session handling options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamableHttpOptions {
    /// Issue session ids on `initialize` and require them afterwards.
    pub stateful: bool,
}

impl Default for StreamableHttpOptions {
    fn default() -> Self {
        Self { stateful: true }
    }
}

/// Builds the axum router serving `server` at [`MCP_PATH`].
#[must_use]
pub fn streamable_http_router(server: ToolServer, options: StreamableHttpOptions) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            stateful_mode: options.stateful,
            ..Default::default()
        },
    );
    Router::new().nest_service(MCP_PATH, service)
}

/// Serves `server` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns any I/O error raised by the listener.
pub async fn serve_http<F>(
    server: ToolServer,
    listener: TcpListener,
    options: StreamableHttpOptions,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(
        server = server.name(),
        addr = ?listener.local_addr().ok(),
        stateful = options.stateful,
        "serving MCP over streamable HTTP"
    );
    let app = streamable_http_router(server, options);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_server::toolsets::weather_server;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const SESSION_HEADER: &str = "mcp-session-id";

    fn post_request(body: &Value, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(MCP_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json, text/event-stream");
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    fn initialize_request() -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0"}
            }
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stateful_initialize_issues_session_id() {
        let app = streamable_http_router(weather_server(), StreamableHttpOptions::default());
        let response = app
            .oneshot(post_request(&initialize_request(), None))
            .await
            .expect("initialize");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(SESSION_HEADER));
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("text/event-stream")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stateless_initialize_has_no_session() {
        let app = streamable_http_router(
            weather_server(),
            StreamableHttpOptions { stateful: false },
        );
        let response = app
            .oneshot(post_request(&initialize_request(), None))
            .await
            .expect("initialize");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(SESSION_HEADER));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stateful_requests_without_session_are_rejected() {
        let app = streamable_http_router(weather_server(), StreamableHttpOptions::default());
        let list = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"});
        let response = app.oneshot(post_request(&list, None)).await.expect("list");
        assert!(response.status().is_client_error(), "status {}", response.status());
    }
}
