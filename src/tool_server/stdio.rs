//! Serving a [`ToolServer`] over a pair of byte streams.

use super::handler::ToolServer;
use rmcp::ServiceExt;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

/// Serves `server` over `input` and `output`, one JSON-RPC message per
/// line, until the client closes `input`.
///
/// # Errors
///
/// Returns an error when the client never completes the handshake or the
/// serving task fails.
pub async fn serve_io<R, W>(server: ToolServer, input: R, output: W) -> io::Result<()>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let name = server.name().to_owned();
    let running = server.serve((input, output)).await.map_err(io::Error::other)?;
    let reason = running.waiting().await.map_err(io::Error::other)?;
    debug!(server = %name, ?reason, "stdio session ended");
    Ok(())
}

/// Serves `server` on the process's standard input and output.
///
/// # Errors
///
/// See [`serve_io`].
pub async fn serve_stdio(server: ToolServer) -> io::Result<()> {
    info!(server = server.name(), tools = ?server.tool_names(), "serving MCP over stdio");
    let (input, output) = rmcp::transport::stdio();
    serve_io(server, input, output).await
}
