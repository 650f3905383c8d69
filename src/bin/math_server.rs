//! Demo MCP server exposing integer `add` and `multiply` tools over stdio.
//!
//! Usage:
//!
//! ```text
//! math_server [--delay-ms <ms>]
//! ```
//!
//! Protocol traffic uses standard input and output; logs go to standard
//! error and honour `RUST_LOG`.

use clap::Parser;
use std::time::Duration;
use toolbridge::telemetry::init_tracing;
use toolbridge::tool_server::{math_server, serve_stdio};

#[derive(Debug, Parser)]
#[command(name = "math_server", about = "MCP math tools over stdio")]
struct Args {
    /// Delay every tool call by this many milliseconds.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();
    let args = Args::parse();
    let server = math_server().with_call_delay(Duration::from_millis(args.delay_ms));
    serve_stdio(server).await?;
    Ok(())
}
