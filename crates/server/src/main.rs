use std::path::PathBuf;
use std::sync::Arc;

use a2a::AgentServer;
use clap::Parser;
use runtime::tools::McpToolProvider;
use runtime::{DatabricksBackend, GenieAgent};
use server::agent_card;
use server::config::Config;
use server::error::Result;
use server::executor::GenieExecutor;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genie-agent")]
#[command(about = "An A2A server exposing a Databricks Genie skill", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "genie.toml")]
    config: PathBuf,

    /// Listen host, overriding the configuration
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overriding the configuration
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        info!(path = %cli.config.display(), "no config file, using defaults");
        Config::default()
    };
    config.apply_env();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let workspace_host = config.workspace_host()?;
    let auth = config.auth()?;

    let mut builder =
        DatabricksBackend::builder(&workspace_host, auth.clone(), &config.llm.endpoint);
    if let Some(max_tokens) = config.llm.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }
    if let Some(temperature) = config.llm.temperature {
        builder = builder.temperature(temperature);
    }
    let backend = builder.build();
    info!(%backend, "model backend ready");

    let endpoints = config.resolved_tool_endpoints(&workspace_host);
    info!(endpoints = endpoints.len(), "mcp tool endpoints configured");
    let tools = McpToolProvider::new(endpoints, Some(auth));

    let agent = GenieAgent::new(backend, tools, &config.llm.system_prompt);
    let executor = GenieExecutor::new(agent);
    let server = AgentServer::new(
        agent_card(&config),
        Arc::new(executor),
        &config.server.rpc_path,
    );

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    server.serve(listener).await?;
    Ok(())
}
