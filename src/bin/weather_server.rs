//! Demo MCP server exposing `get_weather` over streamable HTTP.
//!
//! Usage:
//!
//! ```text
//! weather_server [--bind 127.0.0.1:8000] [--stateless]
//! ```
//!
//! Sessions are tracked with `mcp-session-id` unless `--stateless` is given.
//! The server stops on Ctrl-C.

use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use toolbridge::telemetry::init_tracing;
use toolbridge::tool_server::{StreamableHttpOptions, serve_http, weather_server};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "weather_server", about = "MCP weather tool over streamable HTTP")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,
    /// Answer each request on its own without issuing session ids.
    #[arg(long)]
    stateless: bool,
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();
    let args = Args::parse();
    let listener = TcpListener::bind(args.bind).await?;
    let options = StreamableHttpOptions {
        stateful: !args.stateless,
    };
    serve_http(weather_server(), listener, options, shutdown_signal()).await?;
    Ok(())
}
