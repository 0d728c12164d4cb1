//! Thin client for the Proxmox VE REST API.
//!
//! Authentication uses an API token (`PVEAPIToken=user!name=value` header),
//! so there is no session state to refresh. Every response body arrives as
//! `{"data": ...}`; the helpers unwrap that envelope. Retries and backoff are
//! deliberately absent here; callers surface failures to the MCP client.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::header;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{AuthConfig, ProxmoxConfig};
use crate::model::{
    AgentExecStarted, ClusterStatusEntry, CommandResult, ContainerInfo, NodeInfo, NodeStatus,
    StorageInfo, VmCurrentStatus, VmInfo,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const EXEC_TIMEOUT: Duration = Duration::from_secs(60);
const EXEC_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: Option<T>,
}

/// Shared handle to one Proxmox VE endpoint. Cheap to share behind `Arc`;
/// holds no mutable state.
pub struct ProxmoxClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
    verify_ssl: bool,
}

impl ProxmoxClient {
    pub fn new(proxmox: &ProxmoxConfig, auth: &AuthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!proxmox.verify_ssl)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: format!("https://{}:{}/api2/json", proxmox.host, proxmox.port),
            auth_header: format!(
                "PVEAPIToken={}!{}={}",
                auth.user, auth.token_name, auth.token_value
            ),
            verify_ssl: proxmox.verify_ssl,
        })
    }

    /// Whether TLS certificates are verified for API calls.
    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "proxmox GET");
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header(header::AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .with_context(|| format!("request to {} failed", path))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Proxmox API {} returned {}", path, status);
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .with_context(|| format!("failed to decode response from {}", path))?;
        envelope
            .data
            .ok_or_else(|| anyhow!("Proxmox API {} returned empty data", path))
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, form: &[(&str, &str)]) -> Result<T> {
        debug!(path, "proxmox POST");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header(header::AUTHORIZATION, &self.auth_header)
            .form(form)
            .send()
            .await
            .with_context(|| format!("request to {} failed", path))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Proxmox API {} returned {}", path, status);
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .with_context(|| format!("failed to decode response from {}", path))?;
        envelope
            .data
            .ok_or_else(|| anyhow!("Proxmox API {} returned empty data", path))
    }

    pub async fn nodes(&self) -> Result<Vec<NodeInfo>> {
        self.get("/nodes").await
    }

    pub async fn node_status(&self, node: &str) -> Result<NodeStatus> {
        self.get(&format!("/nodes/{}/status", node)).await
    }

    /// List QEMU VMs across all online nodes, tagging each with its node.
    pub async fn vms(&self) -> Result<Vec<VmInfo>> {
        let mut vms = Vec::new();
        for node in self.nodes().await? {
            if !node.is_online() {
                continue;
            }
            let mut on_node: Vec<VmInfo> =
                self.get(&format!("/nodes/{}/qemu", node.node)).await?;
            for vm in &mut on_node {
                vm.node = node.node.clone();
            }
            vms.extend(on_node);
        }
        Ok(vms)
    }

    /// List LXC containers across all online nodes.
    pub async fn containers(&self) -> Result<Vec<ContainerInfo>> {
        let mut containers = Vec::new();
        for node in self.nodes().await? {
            if !node.is_online() {
                continue;
            }
            let mut on_node: Vec<ContainerInfo> =
                self.get(&format!("/nodes/{}/lxc", node.node)).await?;
            for ct in &mut on_node {
                ct.node = node.node.clone();
            }
            containers.extend(on_node);
        }
        Ok(containers)
    }

    pub async fn storage(&self) -> Result<Vec<StorageInfo>> {
        self.get("/storage").await
    }

    pub async fn cluster_status(&self) -> Result<Vec<ClusterStatusEntry>> {
        self.get("/cluster/status").await
    }

    pub async fn vm_current_status(&self, node: &str, vmid: &str) -> Result<VmCurrentStatus> {
        self.get(&format!("/nodes/{}/qemu/{}/status/current", node, vmid))
            .await
    }

    /// Run a shell command in a VM through the QEMU guest agent.
    ///
    /// Starts the command, then polls `exec-status` until the process exits
    /// or `EXEC_TIMEOUT` elapses. Requires the guest agent to be running in
    /// the VM.
    pub async fn exec_vm_command(
        &self,
        node: &str,
        vmid: &str,
        command: &str,
    ) -> Result<CommandResult> {
        let started: AgentExecStarted = self
            .post(
                &format!("/nodes/{}/qemu/{}/agent/exec", node, vmid),
                &[("command", command)],
            )
            .await
            .with_context(|| {
                format!("failed to start command on VM {} (is the guest agent running?)", vmid)
            })?;

        let status_path = format!(
            "/nodes/{}/qemu/{}/agent/exec-status?pid={}",
            node, vmid, started.pid
        );
        let deadline = tokio::time::Instant::now() + EXEC_TIMEOUT;

        loop {
            let result: CommandResult = self.get(&status_path).await?;
            if result.has_exited() {
                return Ok(result);
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("timed out waiting for command to finish on VM {}", vmid);
            }
            tokio::time::sleep(EXEC_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> ProxmoxClient {
        let proxmox = ProxmoxConfig {
            host: "pve.example.com".into(),
            port: 8006,
            verify_ssl: false,
        };
        let auth = AuthConfig {
            user: "root@pam".into(),
            token_name: "mcp".into(),
            token_value: "secret".into(),
        };
        ProxmoxClient::new(&proxmox, &auth).unwrap()
    }

    #[test]
    fn test_client_urls_and_auth() {
        let client = test_client();
        assert_eq!(client.base_url, "https://pve.example.com:8006/api2/json");
        assert_eq!(client.auth_header, "PVEAPIToken=root@pam!mcp=secret");
        assert!(!client.verify_ssl());
    }

    #[test]
    fn test_envelope_unwrap() {
        let envelope: ApiEnvelope<Vec<NodeInfo>> =
            serde_json::from_str(r#"{"data":[{"node":"pve1","status":"online"}]}"#).unwrap();
        assert_eq!(envelope.data.unwrap().len(), 1);

        let empty: ApiEnvelope<Vec<NodeInfo>> = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert!(empty.data.is_none());
    }
}
