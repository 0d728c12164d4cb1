//! Cluster tools: `get_cluster_status`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use rmcp::model::{CallToolResult, JsonObject};

use crate::format;
use crate::proxmox::ProxmoxClient;
use crate::tools::registry::{ToolContext, ToolHandler, text_result};

pub struct GetClusterStatusHandler {
    client: Arc<ProxmoxClient>,
}

impl GetClusterStatusHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for GetClusterStatusHandler {
    fn name(&self) -> &str {
        "get_cluster_status"
    }

    fn description(&self) -> &str {
        "Get cluster overview: quorum state, member nodes and their online status."
    }

    fn execute(
        &self,
        _args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let entries = client.cluster_status().await?;
            Ok(text_result(vec![format::cluster_status(&entries)]))
        })
    }
}
