//! Diagnostic tools.
//!
//! These tools collect data from the hypervisor API and render a structured
//! report. The report builders are pure functions over the fetched records;
//! the handlers only do the fetching.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use rmcp::model::{CallToolResult, JsonObject};

use crate::format::{format_bytes, format_percent, format_uptime};
use crate::model::{ClusterStatusEntry, NodeInfo, NodeStatus, VmCurrentStatus, VmInfo};
use crate::proxmox::ProxmoxClient;
use crate::tools::registry::{ToolContext, ToolHandler, text_result};
use crate::tools::schema::{ParamKind, ParamSpec};

/// Utilization above this fraction is flagged in health reports.
const PRESSURE_THRESHOLD: f64 = 0.85;
/// Running VMs below this CPU fraction are flagged as idle.
const IDLE_CPU_THRESHOLD: f64 = 0.02;
/// Nodes up longer than this have likely pending kernel updates.
const STALE_UPTIME_SECS: u64 = 90 * 86_400;

fn vm_label(vmid: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{} ({})", vmid, name),
        None => vmid.to_string(),
    }
}

pub fn cluster_health_report(
    cluster: &[ClusterStatusEntry],
    nodes: &[(NodeInfo, NodeStatus)],
) -> String {
    let mut out = String::from("Cluster Health Report\n");

    match cluster.iter().find(|e| e.kind == "cluster") {
        Some(entry) => {
            out.push_str(&format!(
                "\nCluster '{}': quorum {}\n",
                entry.name.as_deref().unwrap_or("unknown"),
                if entry.quorate.unwrap_or(0) == 1 { "OK" } else { "LOST" },
            ));
        }
        None => out.push_str("\nStandalone node, no cluster quorum to check\n"),
    }

    let online = nodes.iter().filter(|(n, _)| n.is_online()).count();
    out.push_str(&format!("Nodes online: {} / {}\n", online, nodes.len()));

    let mut findings = Vec::new();
    for (node, status) in nodes {
        if !node.is_online() {
            findings.push(format!("node {} is offline", node.node));
            continue;
        }
        if let Some(cpu) = status.cpu {
            if cpu > PRESSURE_THRESHOLD {
                findings.push(format!(
                    "node {} CPU at {}",
                    node.node,
                    format_percent(cpu)
                ));
            }
        }
        if let Some(memory) = &status.memory {
            if let Some(fraction) = memory.used_fraction() {
                if fraction > PRESSURE_THRESHOLD {
                    findings.push(format!(
                        "node {} memory at {}",
                        node.node,
                        format_percent(fraction)
                    ));
                }
            }
        }
        if let Some(rootfs) = &status.rootfs {
            if let Some(fraction) = rootfs.used_fraction() {
                if fraction > PRESSURE_THRESHOLD {
                    findings.push(format!(
                        "node {} rootfs at {}",
                        node.node,
                        format_percent(fraction)
                    ));
                }
            }
        }
    }

    if findings.is_empty() {
        out.push_str("\nNo problems detected\n");
    } else {
        out.push_str(&format!("\nFindings ({}):\n", findings.len()));
        for finding in &findings {
            out.push_str(&format!("  - {}\n", finding));
        }
    }
    out
}

pub fn vm_diagnosis_report(node: &str, vmid: &str, status: &VmCurrentStatus) -> String {
    let mut out = format!(
        "VM Diagnosis: {} on {}\n\nstate: {}\n",
        vm_label(vmid, status.name.as_deref()),
        node,
        status.status,
    );
    if let Some(uptime) = status.uptime {
        out.push_str(&format!("uptime: {}\n", format_uptime(uptime)));
    }

    let mut findings = Vec::new();
    if status.status != "running" {
        findings.push(format!("VM is not running (state: {})", status.status));
    }
    if let Some(qmp) = status.qmpstatus.as_deref() {
        if status.status == "running" && qmp != "running" {
            findings.push(format!("QMP state '{}' disagrees with VM state", qmp));
        }
    }
    if status.agent.unwrap_or(0) != 1 {
        findings.push("guest agent not enabled; execute_vm_command will not work".to_string());
    }
    if let (Some(mem), Some(maxmem)) = (status.mem, status.maxmem) {
        if maxmem > 0 {
            let fraction = mem as f64 / maxmem as f64;
            out.push_str(&format!(
                "memory: {} / {} ({})\n",
                format_bytes(mem),
                format_bytes(maxmem),
                format_percent(fraction),
            ));
            if fraction > PRESSURE_THRESHOLD {
                findings.push(format!("memory pressure at {}", format_percent(fraction)));
            }
        }
    }
    if let Some(cpu) = status.cpu {
        out.push_str(&format!("cpu: {}\n", format_percent(cpu)));
        if cpu > PRESSURE_THRESHOLD {
            findings.push(format!("CPU saturated at {}", format_percent(cpu)));
        }
    }

    if findings.is_empty() {
        out.push_str("\nNo issues detected\n");
    } else {
        out.push_str(&format!("\nIssues ({}):\n", findings.len()));
        for finding in &findings {
            out.push_str(&format!("  - {}\n", finding));
        }
    }
    out
}

pub fn resource_optimization_report(vms: &[VmInfo]) -> String {
    let mut out = String::from("Resource Optimization Review\n");
    let mut suggestions = Vec::new();

    for vm in vms {
        let label = vm_label(&vm.vmid, vm.name.as_deref());
        match vm.status.as_str() {
            "stopped" => {
                if let Some(maxmem) = vm.maxmem {
                    suggestions.push(format!(
                        "VM {} is stopped but reserves {} of memory",
                        label,
                        format_bytes(maxmem),
                    ));
                }
            }
            "running" => {
                if let Some(cpu) = vm.cpu {
                    if cpu < IDLE_CPU_THRESHOLD && vm.uptime.unwrap_or(0) > 3_600 {
                        suggestions.push(format!(
                            "VM {} is nearly idle (CPU {}); consider fewer cores",
                            label,
                            format_percent(cpu),
                        ));
                    }
                }
                if let (Some(mem), Some(maxmem)) = (vm.mem, vm.maxmem) {
                    if maxmem > 0 && (mem as f64 / maxmem as f64) < 0.25 {
                        suggestions.push(format!(
                            "VM {} uses {} of {} allocated memory; consider shrinking",
                            label,
                            format_bytes(mem),
                            format_bytes(maxmem),
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    out.push_str(&format!("VMs reviewed: {}\n", vms.len()));
    if suggestions.is_empty() {
        out.push_str("\nNo optimization opportunities found\n");
    } else {
        out.push_str(&format!("\nSuggestions ({}):\n", suggestions.len()));
        for suggestion in &suggestions {
            out.push_str(&format!("  - {}\n", suggestion));
        }
    }
    out
}

pub fn security_posture_report(
    verify_ssl: bool,
    cluster: &[ClusterStatusEntry],
    nodes: &[NodeInfo],
) -> String {
    let mut out = String::from("Security Posture Review\n\n");
    let mut findings = Vec::new();

    out.push_str(&format!(
        "API TLS verification: {}\n",
        if verify_ssl { "enabled" } else { "DISABLED" },
    ));
    if !verify_ssl {
        findings.push(
            "TLS certificate verification is disabled for API calls; enable verify_ssl"
                .to_string(),
        );
    }

    if let Some(entry) = cluster.iter().find(|e| e.kind == "cluster") {
        if entry.quorate.unwrap_or(0) != 1 {
            findings.push("cluster has lost quorum".to_string());
        }
    }

    for node in nodes {
        if !node.is_online() {
            findings.push(format!("node {} is offline", node.node));
            continue;
        }
        if let Some(uptime) = node.uptime {
            if uptime > STALE_UPTIME_SECS {
                findings.push(format!(
                    "node {} up for {}; likely pending kernel updates",
                    node.node,
                    format_uptime(uptime),
                ));
            }
        }
    }

    out.push_str(&format!("Nodes reviewed: {}\n", nodes.len()));
    if findings.is_empty() {
        out.push_str("\nNo findings\n");
    } else {
        out.push_str(&format!("\nFindings ({}):\n", findings.len()));
        for finding in &findings {
            out.push_str(&format!("  - {}\n", finding));
        }
    }
    out
}

pub struct AnalyzeClusterHealthHandler {
    client: Arc<ProxmoxClient>,
}

impl AnalyzeClusterHealthHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for AnalyzeClusterHealthHandler {
    fn name(&self) -> &str {
        "analyze_cluster_health"
    }

    fn description(&self) -> &str {
        "Collect cluster, node and resource data and report quorum state and capacity pressure."
    }

    fn execute(
        &self,
        _args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let cluster = client.cluster_status().await?;
            let mut nodes = Vec::new();
            for node in client.nodes().await? {
                if node.is_online() {
                    let status = client.node_status(&node.node).await?;
                    nodes.push((node, status));
                } else {
                    // Offline nodes stay in the report with empty detail.
                    nodes.push((node, NodeStatus::default()));
                }
            }
            Ok(text_result(vec![cluster_health_report(&cluster, &nodes)]))
        })
    }
}

pub struct DiagnoseVmIssuesHandler {
    client: Arc<ProxmoxClient>,
}

const DIAGNOSE_PARAMS: [ParamSpec; 2] = [
    ParamSpec::required(
        "node",
        ParamKind::String,
        "Proxmox node name hosting the VM (e.g. 'pve1', 'proxmox-node2')",
    ),
    ParamSpec::required(
        "vmid",
        ParamKind::String,
        "Virtual machine ID to diagnose (e.g. '100', '101')",
    ),
];

impl DiagnoseVmIssuesHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for DiagnoseVmIssuesHandler {
    fn name(&self) -> &str {
        "diagnose_vm_issues"
    }

    fn description(&self) -> &str {
        "Inspect one VM's current state and report configuration and capacity issues."
    }

    fn params(&self) -> &[ParamSpec] {
        &DIAGNOSE_PARAMS
    }

    fn execute(
        &self,
        args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
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

        Box::pin(async move {
            let status = client.vm_current_status(&node, &vmid).await?;
            Ok(text_result(vec![vm_diagnosis_report(&node, &vmid, &status)]))
        })
    }
}

pub struct SuggestResourceOptimizationHandler {
    client: Arc<ProxmoxClient>,
}

impl SuggestResourceOptimizationHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for SuggestResourceOptimizationHandler {
    fn name(&self) -> &str {
        "suggest_resource_optimization"
    }

    fn description(&self) -> &str {
        "Review VM resource usage across the cluster and suggest right-sizing opportunities."
    }

    fn execute(
        &self,
        _args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let vms = client.vms().await?;
            Ok(text_result(vec![resource_optimization_report(&vms)]))
        })
    }
}

pub struct AnalyzeSecurityPostureHandler {
    client: Arc<ProxmoxClient>,
}

impl AnalyzeSecurityPostureHandler {
    pub fn new(client: Arc<ProxmoxClient>) -> Self {
        Self { client }
    }
}

impl ToolHandler for AnalyzeSecurityPostureHandler {
    fn name(&self) -> &str {
        "analyze_security_posture"
    }

    fn description(&self) -> &str {
        "Report security-relevant observations: TLS verification, quorum and stale node uptimes."
    }

    fn execute(
        &self,
        _args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let cluster = client.cluster_status().await?;
            let nodes = client.nodes().await?;
            Ok(text_result(vec![security_posture_report(
                client.verify_ssl(),
                &cluster,
                &nodes,
            )]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceUsage;

    fn node(name: &str, status: &str, uptime: Option<u64>) -> NodeInfo {
        NodeInfo {
            node: name.to_string(),
            status: Some(status.to_string()),
            cpu: None,
            maxcpu: None,
            mem: None,
            maxmem: None,
            uptime,
        }
    }

    fn node_status(cpu: f64, mem_used: u64, mem_total: u64) -> NodeStatus {
        NodeStatus {
            uptime: Some(1000),
            cpu: Some(cpu),
            loadavg: None,
            memory: Some(ResourceUsage {
                total: Some(mem_total),
                used: Some(mem_used),
                free: None,
            }),
            swap: None,
            rootfs: None,
            cpuinfo: None,
            kversion: None,
        }
    }

    fn cluster_entry(quorate: u8) -> ClusterStatusEntry {
        ClusterStatusEntry {
            id: "cluster".into(),
            kind: "cluster".into(),
            name: Some("homelab".into()),
            quorate: Some(quorate),
            nodes: Some(2),
            online: None,
            ip: None,
            local: None,
        }
    }

    #[test]
    fn test_health_report_clean() {
        let report = cluster_health_report(
            &[cluster_entry(1)],
            &[(node("pve1", "online", Some(100)), node_status(0.1, 10, 100))],
        );
        assert!(report.contains("quorum OK"));
        assert!(report.contains("Nodes online: 1 / 1"));
        assert!(report.contains("No problems detected"));
    }

    #[test]
    fn test_health_report_flags_pressure_and_offline() {
        let report = cluster_health_report(
            &[cluster_entry(0)],
            &[
                (node("pve1", "online", Some(100)), node_status(0.95, 95, 100)),
                (node("pve2", "offline", None), node_status(0.0, 0, 0)),
            ],
        );
        assert!(report.contains("quorum LOST"));
        assert!(report.contains("pve1 CPU at 95.0%"));
        assert!(report.contains("pve1 memory at 95.0%"));
        assert!(report.contains("pve2 is offline"));
    }

    #[test]
    fn test_vm_diagnosis_stopped_vm() {
        let status = VmCurrentStatus {
            status: "stopped".into(),
            qmpstatus: None,
            name: Some("web01".into()),
            uptime: None,
            cpu: None,
            cpus: None,
            mem: None,
            maxmem: None,
            agent: None,
        };
        let report = vm_diagnosis_report("pve1", "100", &status);
        assert!(report.contains("100 (web01)"));
        assert!(report.contains("VM is not running"));
        assert!(report.contains("guest agent not enabled"));
    }

    #[test]
    fn test_vm_diagnosis_healthy() {
        let status = VmCurrentStatus {
            status: "running".into(),
            qmpstatus: Some("running".into()),
            name: None,
            uptime: Some(7200),
            cpu: Some(0.2),
            cpus: Some(2.0),
            mem: Some(50),
            maxmem: Some(100),
            agent: Some(1),
        };
        let report = vm_diagnosis_report("pve1", "100", &status);
        assert!(report.contains("No issues detected"));
    }

    #[test]
    fn test_optimization_flags_idle_and_stopped() {
        let vms = vec![
            VmInfo {
                vmid: "100".into(),
                name: Some("idle".into()),
                status: "running".into(),
                cpu: Some(0.001),
                cpus: Some(4.0),
                mem: Some(10),
                maxmem: Some(1000),
                uptime: Some(86_400),
                node: "pve1".into(),
            },
            VmInfo {
                vmid: "101".into(),
                name: None,
                status: "stopped".into(),
                cpu: None,
                cpus: None,
                mem: None,
                maxmem: Some(8_589_934_592),
                uptime: None,
                node: "pve1".into(),
            },
        ];
        let report = resource_optimization_report(&vms);
        assert!(report.contains("100 (idle) is nearly idle"));
        assert!(report.contains("101 is stopped but reserves 8.00 GiB"));
    }

    #[test]
    fn test_security_report_flags_tls_and_uptime() {
        let report = security_posture_report(
            false,
            &[cluster_entry(1)],
            &[node("pve1", "online", Some(100 * 86_400))],
        );
        assert!(report.contains("DISABLED"));
        assert!(report.contains("verify_ssl"));
        assert!(report.contains("pve1 up for 100d"));
    }

    #[test]
    fn test_security_report_clean() {
        let report =
            security_posture_report(true, &[cluster_entry(1)], &[node("pve1", "online", Some(60))]);
        assert!(report.contains("No findings"));
    }
}
