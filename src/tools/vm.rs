//! VM tools: `get_vms` and `execute_vm_command`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use rmcp::model::{CallToolResult, JsonObject};

use crate::format;
use crate::proxmox::ProxmoxClient;
use crate::tools::registry::{ToolContext, ToolHandler, text_result};
use crate::tools::schema::{ParamKind, ParamSpec};

pub struct GetVmsHandler {
    client: Arc<ProxmoxClient>,
}

impl GetVmsHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for GetVmsHandler {
    fn name(&self) -> &str {
        "get_vms"
    }

    fn description(&self) -> &str {
        "List all QEMU virtual machines across the cluster with status and memory usage."
    }

    fn execute(
        &self,
        _args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let vms = client.vms().await?;
            Ok(text_result(vec![format::vm_list(&vms)]))
        })
    }
}

pub struct ExecuteVmCommandHandler {
    client: Arc<ProxmoxClient>,
}

const EXECUTE_PARAMS: [ParamSpec; 3] = [
    ParamSpec::required(
        "node",
        ParamKind::String,
        "Host node name (e.g. 'pve1', 'proxmox-node2')",
    ),
    ParamSpec::required("vmid", ParamKind::String, "VM ID number (e.g. '100', '101')"),
    ParamSpec::required(
        "command",
        ParamKind::String,
        "Shell command to run (e.g. 'uname -a', 'systemctl status nginx')",
    ),
];

impl ExecuteVmCommandHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for ExecuteVmCommandHandler {
    fn name(&self) -> &str {
        "execute_vm_command"
    }

    fn description(&self) -> &str {
        "Run a shell command inside a VM via the QEMU guest agent and return its output and exit code."
    }

    fn params(&self) -> &[ParamSpec] {
        &EXECUTE_PARAMS
    }

    fn execute(
        &self,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
        let ct = ctx.ct.clone();
        let node = args
            .get("node")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let vmid = args
            .get("vmid")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Box::pin(async move {
            // Exec can poll for up to a minute; stop early on cancellation.
            let result = tokio::select! {
                res = client.exec_vm_command(&node, &vmid, &command) => res?,
                _ = ct.cancelled() => {
                    anyhow::bail!("command execution cancelled");
                }
            };
            Ok(text_result(vec![format::command_result(
                &node, &vmid, &command, &result,
            )]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, ProxmoxConfig};
    use rmcp::model::JsonObject;
    use tokio_util::sync::CancellationToken;

    fn test_client() -> Arc<ProxmoxClient> {
        let proxmox = ProxmoxConfig {
            host: "pve.example.com".into(),
            port: 8006,
            verify_ssl: true,
        };
        let auth = AuthConfig {
            user: "root@pam".into(),
            token_name: "mcp".into(),
            token_value: "secret".into(),
        };
        Arc::new(ProxmoxClient::new(&proxmox, &auth).unwrap())
    }

    fn exec_args() -> JsonObject {
        serde_json::from_str(r#"{"node":"pve1","vmid":"100","command":"uptime"}"#).unwrap()
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_command() {
        let handler = ExecuteVmCommandHandler::new(test_client());

        // The remote endpoint is unreachable, so without cancellation the
        // handler would sit in the exec call until its timeout.
        let ct = CancellationToken::new();
        ct.cancel();
        let ctx = ToolContext::new(ct);

        let err = handler
            .execute(exec_args(), &ctx)
            .await
            .expect_err("cancelled request must not produce a result");
        assert!(err.to_string().contains("cancelled"));
    }
}
