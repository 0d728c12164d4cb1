//! Node management tools: `get_nodes` and `get_node_status`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use rmcp::model::{CallToolResult, JsonObject};

use crate::format;
use crate::proxmox::ProxmoxClient;
use crate::tools::registry::{ToolContext, ToolHandler, text_result};
use crate::tools::schema::{ParamKind, ParamSpec};

pub struct GetNodesHandler {
    client: Arc<ProxmoxClient>,
}

impl GetNodesHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for GetNodesHandler {
    fn name(&self) -> &str {
        "get_nodes"
    }

    fn description(&self) -> &str {
        "List all nodes in the Proxmox cluster with their status, uptime and memory usage."
    }

    fn execute(
        &self,
        _args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let nodes = client.nodes().await?;
            Ok(text_result(vec![format::node_list(&nodes)]))
        })
    }
}

pub struct GetNodeStatusHandler {
    client: Arc<ProxmoxClient>,
}

const NODE_STATUS_PARAMS: [ParamSpec; 1] = [ParamSpec::required(
    "node",
    ParamKind::String,
    "Name/ID of node to query (e.g. 'pve1', 'proxmox-node2')",
)];

impl GetNodeStatusHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for GetNodeStatusHandler {
    fn name(&self) -> &str {
        "get_node_status"
    }

    fn description(&self) -> &str {
        "Get detailed status for a single node: uptime, CPU, memory, rootfs and kernel version."
    }

    fn params(&self) -> &[ParamSpec] {
        &NODE_STATUS_PARAMS
    }

    fn execute(
        &self,
        args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
        // Presence/type guaranteed by schema validation.
        let node = args
            .get("node")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Box::pin(async move {
            let status = client.node_status(&node).await?;
            Ok(text_result(vec![format::node_status(&node, &status)]))
        })
    }
}
