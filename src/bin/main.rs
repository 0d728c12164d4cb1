use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use proxmox_mcp::config::{self, LoggingConfig};
use proxmox_mcp::server::{self, shutdown_signal};
use tracing::info;
use tracing_subscriber::EnvFilter;

// rmcp imports for MCP stdio server mode
use rmcp::service::ServiceExt;
use rmcp::transport::stdio;

#[derive(Parser)]
#[command(name = "proxmox-mcp")]
#[command(about = "MCP server for Proxmox VE management")]
struct Cli {
    /// Path to the JSON configuration file (falls back to PROXMOX_MCP_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdio (the default when no subcommand is given)
    Stdio,
    /// Serve MCP over streamable HTTP
    Http {
        /// Bind address, e.g. 127.0.0.1:3940
        #[arg(long, default_value = "127.0.0.1:3940")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::resolve_config_path()?,
    };
    let config = config::load_config(&config_path)?;
    init_tracing(&config.logging)?;

    let server = proxmox_mcp::create_server(&config)?;
    info!(
        host = %config.proxmox.host,
        tools = server.tool_registry().len(),
        "Proxmox MCP server initialized"
    );

    match cli.command.unwrap_or(Commands::Stdio) {
        Commands::Stdio => {
            info!("Starting MCP stdio server");

            // McpServer implements ServerHandler; serve it over stdio.
            let service = server
                .as_ref()
                .clone()
                .serve(stdio())
                .await
                .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;

            // On SIGINT/SIGTERM stop accepting requests and drain in-flight
            // work through the service's cancellation token.
            let ct = service.cancellation_token();
            tokio::spawn(async move {
                shutdown_signal().await;
                ct.cancel();
            });

            service.waiting().await?;
            info!("MCP stdio server session ended");
        }
        Commands::Http { bind } => {
            info!("Starting MCP HTTP server on {}", bind);
            server::start_http(server, &bind).await?;
        }
    }

    Ok(())
}

/// Logging goes to stderr (or the configured file); stdout carries the MCP
/// protocol in stdio mode.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let default_filter = format!(
        "proxmox_mcp={},rmcp=warn",
        logging.level.to_lowercase()
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
