//! Typed records for the Proxmox VE API payloads the tools consume.
//!
//! Fields the tools do not read are omitted; serde ignores the rest of the
//! payload. Numeric fields that older API versions report inconsistently are
//! `Option` or use a lenient deserializer.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One entry from `GET /nodes`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfo {
    pub node: String,
    pub status: Option<String>,
    pub cpu: Option<f64>,
    pub maxcpu: Option<u64>,
    pub mem: Option<u64>,
    pub maxmem: Option<u64>,
    pub uptime: Option<u64>,
}

impl NodeInfo {
    pub fn is_online(&self) -> bool {
        self.status.as_deref() == Some("online")
    }
}

/// `GET /nodes/{node}/status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeStatus {
    pub uptime: Option<u64>,
    pub cpu: Option<f64>,
    pub loadavg: Option<Vec<String>>,
    pub memory: Option<ResourceUsage>,
    pub swap: Option<ResourceUsage>,
    pub rootfs: Option<ResourceUsage>,
    pub cpuinfo: Option<CpuInfo>,
    pub kversion: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceUsage {
    pub total: Option<u64>,
    pub used: Option<u64>,
    pub free: Option<u64>,
}

impl ResourceUsage {
    /// Used fraction in `[0, 1]`, when both sides are known and non-zero.
    pub fn used_fraction(&self) -> Option<f64> {
        match (self.used, self.total) {
            (Some(used), Some(total)) if total > 0 => Some(used as f64 / total as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuInfo {
    pub cpus: Option<u64>,
    pub model: Option<String>,
}

/// One entry from `GET /nodes/{node}/qemu`.
#[derive(Debug, Clone, Deserialize)]
pub struct VmInfo {
    #[serde(deserialize_with = "de_id")]
    pub vmid: String,
    pub name: Option<String>,
    pub status: String,
    pub cpu: Option<f64>,
    pub cpus: Option<f64>,
    pub mem: Option<u64>,
    pub maxmem: Option<u64>,
    pub uptime: Option<u64>,
    /// Filled in by the client; not part of the API payload.
    #[serde(default)]
    pub node: String,
}

/// One entry from `GET /nodes/{node}/lxc`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerInfo {
    #[serde(deserialize_with = "de_id")]
    pub vmid: String,
    pub name: Option<String>,
    pub status: String,
    pub cpus: Option<f64>,
    pub mem: Option<u64>,
    pub maxmem: Option<u64>,
    pub uptime: Option<u64>,
    #[serde(default)]
    pub node: String,
}

/// One entry from `GET /storage`.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageInfo {
    pub storage: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Option<String>,
    pub shared: Option<u8>,
    pub enabled: Option<u8>,
    pub total: Option<u64>,
    pub used: Option<u64>,
    pub avail: Option<u64>,
}

/// One entry from `GET /cluster/status` (`type` is `cluster` or `node`).
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterStatusEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: Option<String>,
    pub quorate: Option<u8>,
    pub nodes: Option<u64>,
    pub online: Option<u8>,
    pub ip: Option<String>,
    pub local: Option<u8>,
}

/// `GET /nodes/{node}/qemu/{vmid}/status/current`.
#[derive(Debug, Clone, Deserialize)]
pub struct VmCurrentStatus {
    pub status: String,
    pub qmpstatus: Option<String>,
    pub name: Option<String>,
    pub uptime: Option<u64>,
    pub cpu: Option<f64>,
    pub cpus: Option<f64>,
    pub mem: Option<u64>,
    pub maxmem: Option<u64>,
    pub agent: Option<u8>,
}

/// `POST /nodes/{node}/qemu/{vmid}/agent/exec` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentExecStarted {
    pub pid: i64,
}

/// `GET /nodes/{node}/qemu/{vmid}/agent/exec-status`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandResult {
    pub exited: Option<u8>,
    pub exitcode: Option<i64>,
    #[serde(rename = "out-data")]
    pub out_data: Option<String>,
    #[serde(rename = "err-data")]
    pub err_data: Option<String>,
}

impl CommandResult {
    pub fn has_exited(&self) -> bool {
        self.exited.unwrap_or(0) == 1
    }
}

/// Proxmox reports vmid as a number on some endpoints and a string on others.
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for vmid, got {}",
            other
        ))),
    }
}
