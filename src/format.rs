//! Text templates for tool output.
//!
//! Every tool renders its result through one of these templates so the
//! response envelope always carries plain, consistently shaped text. Item
//! order is preserved from the API responses.

use crate::model::{
    ClusterStatusEntry, CommandResult, ContainerInfo, NodeInfo, NodeStatus, StorageInfo, VmInfo,
};

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// `ratio` is a fraction in `[0, 1]`.
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn opt_uptime(uptime: Option<u64>) -> String {
    uptime.map(format_uptime).unwrap_or_else(|| "n/a".to_string())
}

pub fn node_list(nodes: &[NodeInfo]) -> String {
    if nodes.is_empty() {
        return "No nodes found".to_string();
    }
    let mut out = format!("Proxmox Nodes ({})\n", nodes.len());
    for node in nodes {
        out.push_str(&format!(
            "\n{} [{}]\n  uptime: {}\n  memory: {} / {}\n",
            node.node,
            node.status.as_deref().unwrap_or("unknown"),
            opt_uptime(node.uptime),
            format_bytes(node.mem.unwrap_or(0)),
            format_bytes(node.maxmem.unwrap_or(0)),
        ));
    }
    out
}

pub fn node_status(name: &str, status: &NodeStatus) -> String {
    let mut out = format!("Node: {}\n", name);
    out.push_str(&format!("  uptime: {}\n", opt_uptime(status.uptime)));
    if let Some(cpu) = status.cpu {
        out.push_str(&format!("  cpu: {}\n", format_percent(cpu)));
    }
    if let Some(cpuinfo) = &status.cpuinfo {
        if let Some(cpus) = cpuinfo.cpus {
            out.push_str(&format!("  cores: {}\n", cpus));
        }
        if let Some(model) = &cpuinfo.model {
            out.push_str(&format!("  cpu model: {}\n", model));
        }
    }
    if let Some(memory) = &status.memory {
        out.push_str(&format!(
            "  memory: {} / {}",
            format_bytes(memory.used.unwrap_or(0)),
            format_bytes(memory.total.unwrap_or(0)),
        ));
        if let Some(fraction) = memory.used_fraction() {
            out.push_str(&format!(" ({})", format_percent(fraction)));
        }
        out.push('\n');
    }
    if let Some(rootfs) = &status.rootfs {
        out.push_str(&format!(
            "  rootfs: {} / {}\n",
            format_bytes(rootfs.used.unwrap_or(0)),
            format_bytes(rootfs.total.unwrap_or(0)),
        ));
    }
    if let Some(loadavg) = &status.loadavg {
        out.push_str(&format!("  loadavg: {}\n", loadavg.join(", ")));
    }
    if let Some(kversion) = &status.kversion {
        out.push_str(&format!("  kernel: {}\n", kversion));
    }
    out
}

pub fn vm_list(vms: &[VmInfo]) -> String {
    if vms.is_empty() {
        return "No virtual machines found".to_string();
    }
    let mut out = format!("Virtual Machines ({})\n", vms.len());
    for vm in vms {
        out.push_str(&format!(
            "\n{} - {} [{}]\n  node: {}\n  memory: {} / {}\n",
            vm.vmid,
            vm.name.as_deref().unwrap_or("unnamed"),
            vm.status,
            vm.node,
            format_bytes(vm.mem.unwrap_or(0)),
            format_bytes(vm.maxmem.unwrap_or(0)),
        ));
    }
    out
}

pub fn container_list(containers: &[ContainerInfo]) -> String {
    if containers.is_empty() {
        return "No containers found".to_string();
    }
    let mut out = format!("Containers ({})\n", containers.len());
    for ct in containers {
        out.push_str(&format!(
            "\n{} - {} [{}]\n  node: {}\n  memory: {} / {}\n",
            ct.vmid,
            ct.name.as_deref().unwrap_or("unnamed"),
            ct.status,
            ct.node,
            format_bytes(ct.mem.unwrap_or(0)),
            format_bytes(ct.maxmem.unwrap_or(0)),
        ));
    }
    out
}

pub fn storage_list(stores: &[StorageInfo]) -> String {
    if stores.is_empty() {
        return "No storage pools found".to_string();
    }
    let mut out = format!("Storage Pools ({})\n", stores.len());
    for store in stores {
        out.push_str(&format!(
            "\n{} [{}]\n",
            store.storage, store.kind
        ));
        if let Some(content) = &store.content {
            out.push_str(&format!("  content: {}\n", content));
        }
        if let (Some(used), Some(total)) = (store.used, store.total) {
            out.push_str(&format!(
                "  usage: {} / {}\n",
                format_bytes(used),
                format_bytes(total),
            ));
        }
        out.push_str(&format!(
            "  shared: {}\n",
            if store.shared.unwrap_or(0) == 1 { "yes" } else { "no" }
        ));
    }
    out
}

pub fn cluster_status(entries: &[ClusterStatusEntry]) -> String {
    let mut out = String::from("Cluster Status\n");
    for entry in entries {
        match entry.kind.as_str() {
            "cluster" => {
                out.push_str(&format!(
                    "\nCluster: {}\n  quorate: {}\n  nodes: {}\n",
                    entry.name.as_deref().unwrap_or("unknown"),
                    if entry.quorate.unwrap_or(0) == 1 { "yes" } else { "NO" },
                    entry.nodes.unwrap_or(0),
                ));
            }
            "node" => {
                out.push_str(&format!(
                    "\nNode: {} [{}]\n",
                    entry.name.as_deref().unwrap_or(&entry.id),
                    if entry.online.unwrap_or(0) == 1 { "online" } else { "offline" },
                ));
                if let Some(ip) = &entry.ip {
                    out.push_str(&format!("  ip: {}\n", ip));
                }
            }
            _ => {}
        }
    }
    if entries.iter().all(|e| e.kind != "cluster") {
        out.push_str("\nStandalone node (no cluster configured)\n");
    }
    out
}

pub fn command_result(node: &str, vmid: &str, command: &str, result: &CommandResult) -> String {
    let mut out = format!(
        "Command on VM {} ({}): {}\nexit code: {}\n",
        vmid,
        node,
        command,
        result
            .exitcode
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    );
    match result.out_data.as_deref() {
        Some(stdout) if !stdout.is_empty() => {
            out.push_str("\noutput:\n");
            out.push_str(stdout);
        }
        _ => out.push_str("\n(no output)\n"),
    }
    if let Some(stderr) = result.err_data.as_deref() {
        if !stderr.is_empty() {
            out.push_str("\nstderr:\n");
            out.push_str(stderr);
        }
    }
    out
}
