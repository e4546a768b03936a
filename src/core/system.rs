/// Whole-system metrics from sysinfo

use sysinfo::{Components, Disks, Networks, System};

use crate::core::error::DashError;
use crate::core::metrics::{
    BatteryStats, DiskStats, HostInfo, MemoryStats, MetricsProvider, NetworkStats, SystemSnapshot,
    Temperature,
};

pub struct SystemProvider {
    system: System,
    networks: Networks,
    disks: Disks,
    components: Components,
}

impl Default for SystemProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProvider {
    pub fn new() -> Self {
        let mut system = System::new();
        // Seed the CPU counters so the first sample has a delta to work with.
        system.refresh_cpu();
        Self {
            system,
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
            components: Components::new_with_refreshed_list(),
        }
    }

    fn collect(&mut self) -> SystemSnapshot {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.networks.refresh();
        self.disks.refresh();
        self.components.refresh();

        let cpu = self
            .system
            .cpus()
            .iter()
            .map(|c| c.cpu_usage() as f64)
            .collect();

        let memory = MemoryStats {
            total: self.system.total_memory(),
            used: self.system.used_memory(),
            available: self.system.available_memory(),
            swap_total: self.system.total_swap(),
            swap_used: self.system.used_swap(),
        };

        let mut disks: Vec<DiskStats> = self
            .disks
            .iter()
            .map(|d| DiskStats {
                name: d.name().to_string_lossy().to_string(),
                mount_point: d.mount_point().display().to_string(),
                file_system: d.file_system().to_string_lossy().to_string(),
                total: d.total_space(),
                available: d.available_space(),
            })
            .collect();
        disks.sort_by(|a, b| a.mount_point.cmp(&b.mount_point));

        let mut networks: Vec<NetworkStats> = self
            .networks
            .iter()
            .map(|(name, data)| NetworkStats {
                interface: name.clone(),
                rx: data.received(),
                tx: data.transmitted(),
                total_rx: data.total_received(),
                total_tx: data.total_transmitted(),
            })
            .collect();
        networks.sort_by(|a, b| a.interface.cmp(&b.interface));

        let mut temperatures: Vec<Temperature> = self
            .components
            .list()
            .iter()
            .filter(|c| c.temperature().is_finite())
            .map(|c| Temperature {
                label: c.label().to_string(),
                current: c.temperature() as f64,
                critical: c.critical().filter(|t| t.is_finite()).map(f64::from),
            })
            .collect();
        temperatures.sort_by(|a, b| a.label.cmp(&b.label));

        let load = System::load_average();
        let host = HostInfo {
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            os: System::long_os_version().unwrap_or_else(|| "unknown".to_string()),
            kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            uptime: System::uptime(),
            load_average: (load.one, load.five, load.fifteen),
        };

        SystemSnapshot {
            cpu,
            memory,
            disks,
            networks,
            temperatures,
            battery: read_battery(),
            host,
        }
    }
}

/// First battery under /sys/class/power_supply.
#[cfg(target_os = "linux")]
fn read_battery() -> Option<BatteryStats> {
    use std::fs;

    let entries = fs::read_dir("/sys/class/power_supply").ok()?;
    entries.flatten().map(|e| e.path()).find_map(|path| {
        let kind = fs::read_to_string(path.join("type")).ok()?;
        if kind.trim() != "Battery" {
            return None;
        }
        let percent = fs::read_to_string(path.join("capacity"))
            .ok()?
            .trim()
            .parse::<f64>()
            .ok()?;
        let status = fs::read_to_string(path.join("status"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "Unknown".to_string());
        Some(BatteryStats { percent, status })
    })
}

#[cfg(not(target_os = "linux"))]
fn read_battery() -> Option<BatteryStats> {
    None
}

impl MetricsProvider for SystemProvider {
    type Snapshot = SystemSnapshot;

    async fn sample(&mut self) -> Result<SystemSnapshot, DashError> {
        let snapshot = self.collect();
        if snapshot.cpu.is_empty() {
            return Err(DashError::Provider("no CPUs reported by the kernel".into()));
        }
        Ok(snapshot)
    }
}
