//! Multichain MCP Server - Entry point

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::service::ServiceExt;
use tracing_subscriber::EnvFilter;

use multichain_mcp::{config::Config, evm::ChainRegistry, MultichainMcpHandler, ServiceContext};

/// Multichain MCP Server - read-only blockchain queries over the Model Context Protocol
#[derive(Parser, Debug)]
#[command(name = "multichain-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Reject unknown network names instead of falling back to Ethereum mainnet
    #[arg(long)]
    strict_networks: bool,

    /// Log filter (e.g. "debug", "multichain_mcp=trace"); overrides RUST_LOG
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    let mut config = match cli.config {
        Some(ref config_path) => Config::from_file(config_path)?,
        None => Config::load_default(),
    };
    if cli.strict_networks {
        config.strict_network_resolution = true;
    }

    ChainRegistry::validate_builtin().context("Built-in chain registry is inconsistent")?;
    log_config_status(&config);

    let ctx = ServiceContext::new(config)?;
    let handler = MultichainMcpHandler::new(ctx);

    // stdout carries the MCP protocol; logs go to stderr
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let service = handler.serve((stdin, stdout)).await?;
    tracing::info!("serving MCP over stdio");
    service.waiting().await?;

    Ok(())
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log filter: {}", level))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("multichain_mcp=info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    Ok(())
}

fn log_config_status(config: &Config) {
    let registry = ChainRegistry::builtin();
    tracing::info!(
        chains = registry.chains().len(),
        aliases = registry.alias_count(),
        strict = config.strict_network_resolution,
        "chain registry loaded"
    );
    if !config.rpc_urls.is_empty() {
        tracing::info!(overrides = config.rpc_urls.len(), "configured RPC overrides");
    }
}
