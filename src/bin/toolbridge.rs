//! Connects an agent to the MCP servers named in a JSON configuration file
//! and answers queries with their tools.
//!
//! Usage:
//!
//! ```text
//! toolbridge --config <path> [--query <text>]... [--list-tools]
//! ```
//!
//! Without `--query` the two demo questions are asked. The model API key is
//! read from the variable named in the configuration (`GROQ_API_KEY` by
//! default); a `.env` file in the working directory is loaded first.

use clap::Parser;
use eyre::WrapErr;
use mockable::DefaultClock;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use toolbridge::agent::adapters::OpenAiCompatibleBackend;
use toolbridge::agent::services::AgentLoop;
use toolbridge::config::ToolbridgeConfig;
use toolbridge::telemetry::init_tracing;
use toolbridge::tool_registry::adapters::TransportConnector;
use toolbridge::tool_registry::services::ToolRegistry;
use tracing::{info, warn};

const DEFAULT_QUERIES: [&str; 2] = [
    "what is (3+5) x 10 ?",
    "what is the weather in Colombo?",
];

type Registry = ToolRegistry<TransportConnector, DefaultClock>;

#[derive(Debug, Parser)]
#[command(name = "toolbridge", about = "Answer queries with tools from MCP servers")]
struct Args {
    /// JSON configuration file.
    #[arg(long, short)]
    config: PathBuf,
    /// Query to answer; may be repeated.
    #[arg(long = "query", short)]
    queries: Vec<String>,
    /// Print the discovered tools and exit without contacting the model.
    #[arg(long)]
    list_tools: bool,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eyre::bail!("failed to load .env: {err}");
    }
    init_tracing();
    let args = Args::parse();

    let config = ToolbridgeConfig::from_path(&args.config)
        .wrap_err_with(|| format!("loading {}", args.config.display()))?;
    let api_key = if args.list_tools {
        None
    } else {
        Some(config.model.api_key_from_env()?)
    };

    let connector =
        TransportConnector::new().with_shutdown_grace(config.registry.shutdown_grace);
    let registry = Arc::new(ToolRegistry::new(
        Arc::new(connector),
        Arc::new(DefaultClock),
        config.registry.registry_options(),
    ));
    registry.register(config.servers.clone()).await?;

    let outcome = run(&registry, &config, api_key, &args).await;
    registry.shutdown().await;
    outcome
}

async fn run(
    registry: &Arc<Registry>,
    config: &ToolbridgeConfig,
    api_key: Option<String>,
    args: &Args,
) -> eyre::Result<()> {
    let discovered = registry.discover_tools().await?;
    for server in discovered.unavailable() {
        warn!(server = %server.server, reason = %server.reason, "MCP server unavailable");
    }
    info!(tools = ?discovered.tool_names(), "tools discovered");

    let mut stdout = std::io::stdout();
    let Some(key) = api_key else {
        for tool in discovered.tools().values() {
            writeln!(
                stdout,
                "{}\t{}\t{}",
                tool.name(),
                tool.server(),
                tool.description().unwrap_or_default()
            )?;
        }
        return Ok(());
    };

    let model = &config.model;
    let backend = OpenAiCompatibleBackend::new(&model.api_base, key, model.model.clone())?;
    let mut agent = AgentLoop::new(Arc::new(backend), Arc::clone(registry))
        .with_max_iterations(model.max_iterations);
    if let Some(prompt) = &model.system_prompt {
        agent = agent.with_system_prompt(prompt.clone());
    }

    let queries: Vec<&str> = if args.queries.is_empty() {
        DEFAULT_QUERIES.to_vec()
    } else {
        args.queries.iter().map(String::as_str).collect()
    };
    for query in queries {
        let answer = agent
            .ask(query)
            .await
            .wrap_err_with(|| format!("answering '{query}'"))?;
        writeln!(stdout, "Query: {query}\nResponse: {}\n", answer.final_message())?;
    }
    Ok(())
}
