// Core modules
pub mod config;
pub mod format;
pub mod model;
pub mod proxmox;
pub mod server;
pub mod tools;

// Re-export key types and functions
pub use config::{Config, ConfigError, load_config, resolve_config_path};
pub use proxmox::ProxmoxClient;
pub use server::McpServer;
pub use tools::{ToolHandler, ToolRegistry};

use std::sync::Arc;

use anyhow::Result;
use tools::{
    AnalyzeClusterHealthHandler, AnalyzeSecurityPostureHandler, DiagnoseVmIssuesHandler,
    ExecuteVmCommandHandler, GetClusterStatusHandler, GetContainersHandler, GetNodeStatusHandler,
    GetNodesHandler, GetStorageHandler, GetVmsHandler, SuggestResourceOptimizationHandler,
};

/// Create a fully configured MCP server: API client, tool registry with all
/// Proxmox tools, and an `McpServer` implementing rmcp's `ServerHandler`.
pub fn create_server(config: &Config) -> Result<Arc<McpServer>> {
    let client = Arc::new(ProxmoxClient::new(&config.proxmox, &config.auth)?);

    let registry = ToolRegistry::new()
        .register(GetNodesHandler::new(client.clone()))?
        .register(GetNodeStatusHandler::new(client.clone()))?
        .register(GetVmsHandler::new(client.clone()))?
        .register(GetContainersHandler::new(client.clone()))?
        .register(ExecuteVmCommandHandler::new(client.clone()))?
        .register(GetStorageHandler::new(client.clone()))?
        .register(GetClusterStatusHandler::new(client.clone()))?
        .register(AnalyzeClusterHealthHandler::new(client.clone()))?
        .register(DiagnoseVmIssuesHandler::new(client.clone()))?
        .register(SuggestResourceOptimizationHandler::new(client.clone()))?
        .register(AnalyzeSecurityPostureHandler::new(client))?;

    Ok(Arc::new(McpServer::new(Arc::new(registry))))
}
