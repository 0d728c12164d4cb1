//! Container tools: `get_containers`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use rmcp::model::{CallToolResult, JsonObject};

use crate::format;
use crate::proxmox::ProxmoxClient;
use crate::tools::registry::{ToolContext, ToolHandler, text_result};

pub struct GetContainersHandler {
    client: Arc<ProxmoxClient>,
}

impl GetContainersHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for GetContainersHandler {
    fn name(&self) -> &str {
        "get_containers"
    }

    fn description(&self) -> &str {
        "List all LXC containers across the cluster with status and memory usage."
    }

    fn execute(
        &self,
        _args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let containers = client.containers().await?;
            Ok(text_result(vec![format::container_list(&containers)]))
        })
    }
}
