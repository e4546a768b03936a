/// Metric snapshot types and the provider seam the producers sample through

use std::future::Future;

use tokio::time::Instant;

use crate::core::error::DashError;

/// Source of whole snapshots for one entity selector.
///
/// Called at most once per tick and never concurrently for the same
/// provider; retrying transient failures is the provider's own business.
pub trait MetricsProvider {
    type Snapshot: Send + 'static;

    fn sample(&mut self) -> impl Future<Output = Result<Self::Snapshot, DashError>> + Send;
}

/// One snapshot plus the moment its sampling started.
#[derive(Debug, Clone)]
pub struct Sample<S> {
    pub seq: u64,
    pub taken_at: Instant,
    pub data: S,
}

// ---------------------------------------------------------------------------
// Whole system

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemSnapshot {
    /// Per-core utilisation in percent
    pub cpu: Vec<f64>,
    pub memory: MemoryStats,
    pub disks: Vec<DiskStats>,
    pub networks: Vec<NetworkStats>,
    pub temperatures: Vec<Temperature>,
    /// None where the platform reports no battery
    pub battery: Option<BatteryStats>,
    pub host: HostInfo,
}

impl SystemSnapshot {
    pub fn average_cpu(&self) -> f64 {
        if self.cpu.is_empty() {
            0.0
        } else {
            self.cpu.iter().sum::<f64>() / self.cpu.len() as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStats {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub swap_total: u64,
    pub swap_used: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskStats {
    pub name: String,
    pub mount_point: String,
    pub file_system: String,
    pub total: u64,
    pub available: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkStats {
    pub interface: String,
    /// Bytes since the previous sample
    pub rx: u64,
    pub tx: u64,
    pub total_rx: u64,
    pub total_tx: u64,
}

/// One hardware sensor, in degrees Celsius
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Temperature {
    pub label: String,
    pub current: f64,
    pub critical: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatteryStats {
    pub percent: f64,
    /// Charging, Discharging, Full and so on, as the kernel reports it
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
    pub kernel: String,
    pub uptime: u64,
    pub load_average: (f64, f64, f64),
}

// ---------------------------------------------------------------------------
// Processes

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub command: String,
    pub cpu: f64,
    pub memory_percent: f64,
    pub status: String,
    pub parent: Option<u32>,
    /// Seconds since the epoch
    pub start_time: u64,
    /// Seconds
    pub run_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessListSnapshot {
    pub processes: Vec<ProcessRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessDetailSnapshot {
    pub process: ProcessRow,
    pub exe: String,
    pub cmdline: String,
    pub memory: u64,
    pub virtual_memory: u64,
    pub read_bytes: u64,
    pub written_bytes: u64,
    pub children: Vec<ProcessRow>,
    /// The process went away after startup; everything else is its last reading
    pub exited: bool,
}

// ---------------------------------------------------------------------------
// Containers

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerRow {
    pub id: String,
    pub image: String,
    pub name: String,
    pub status: String,
    pub state: String,
    pub cpu: f64,
    pub memory_percent: f64,
    pub net_rx: u64,
    pub net_tx: u64,
    pub block_read: u64,
    pub block_write: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerListSnapshot {
    pub containers: Vec<ContainerRow>,
}

impl ContainerListSnapshot {
    pub fn total_cpu(&self) -> f64 {
        self.containers.iter().map(|c| c.cpu).sum()
    }

    pub fn total_memory(&self) -> f64 {
        self.containers.iter().map(|c| c.memory_percent).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MountInfo {
    pub source: String,
    pub destination: String,
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerNetwork {
    pub name: String,
    pub ip_address: String,
    pub gateway: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortMapping {
    pub host: String,
    pub container: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerProcess {
    pub uid: String,
    pub pid: String,
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerDetailSnapshot {
    pub summary: ContainerRow,
    pub pid: Option<i64>,
    /// None when the daemon has no previous reading yet
    pub per_cpu: Vec<Option<f64>>,
    pub mounts: Vec<MountInfo>,
    pub networks: Vec<ContainerNetwork>,
    pub ports: Vec<PortMapping>,
    pub processes: Vec<ContainerProcess>,
}
