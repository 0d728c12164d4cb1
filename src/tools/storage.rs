//! Storage tools: `get_storage`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use rmcp::model::{CallToolResult, JsonObject};

use crate::format;
use crate::proxmox::ProxmoxClient;
use crate::tools::registry::{ToolContext, ToolHandler, text_result};

pub struct GetStorageHandler {
    client: Arc<ProxmoxClient>,
}

impl GetStorageHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for GetStorageHandler {
    fn name(&self) -> &str {
        "get_storage"
    }

    fn description(&self) -> &str {
        "List storage pools with type, content kinds and usage where available."
    }

    fn execute(
        &self,
        _args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let stores = client.storage().await?;
            Ok(text_result(vec![format::storage_list(&stores)]))
        })
    }
}
