/// Process metrics from sysinfo

use sysinfo::{Pid, Process, System};
use tracing::warn;

use crate::core::error::DashError;
use crate::core::metrics::{MetricsProvider, ProcessDetailSnapshot, ProcessListSnapshot, ProcessRow};

fn process_row(process: &Process, total_memory: u64) -> ProcessRow {
    let memory_percent = if total_memory > 0 {
        process.memory() as f64 / total_memory as f64 * 100.0
    } else {
        0.0
    };

    ProcessRow {
        pid: process.pid().as_u32(),
        command: process.name().to_string(),
        cpu: process.cpu_usage() as f64,
        memory_percent,
        status: process.status().to_string(),
        parent: process.parent().map(|p| p.as_u32()),
        start_time: process.start_time(),
        run_time: process.run_time(),
    }
}

/// Check a user-supplied pid before any view is built.
pub fn validate_pid(pid: u32) -> Result<(), DashError> {
    let mut system = System::new();
    if system.refresh_process(Pid::from_u32(pid)) {
        Ok(())
    } else {
        Err(DashError::InvalidPid(pid))
    }
}

/// Every process on the machine
pub struct ProcessListProvider {
    system: System,
}

impl Default for ProcessListProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessListProvider {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_processes();
        Self { system }
    }
}

impl MetricsProvider for ProcessListProvider {
    type Snapshot = ProcessListSnapshot;

    async fn sample(&mut self) -> Result<ProcessListSnapshot, DashError> {
        self.system.refresh_memory();
        self.system.refresh_processes();

        let total = self.system.total_memory();
        let mut processes: Vec<ProcessRow> = self
            .system
            .processes()
            .values()
            .map(|p| process_row(p, total))
            .collect();
        processes.sort_by_key(|p| p.pid);

        Ok(ProcessListSnapshot { processes })
    }
}

/// One process and its direct children
///
/// Once the process exits the provider keeps serving its last reading,
/// flagged as exited, so the view stays up instead of failing.
pub struct ProcessDetailProvider {
    pid: u32,
    system: System,
    last: Option<ProcessDetailSnapshot>,
}

impl ProcessDetailProvider {
    pub fn new(pid: u32) -> Self {
        let mut system = System::new();
        system.refresh_processes();
        Self { pid, system, last: None }
    }

    fn exited(&mut self) -> ProcessDetailSnapshot {
        let mut snapshot = self.last.take().unwrap_or_else(|| ProcessDetailSnapshot {
            process: ProcessRow { pid: self.pid, ..Default::default() },
            ..Default::default()
        });
        if !snapshot.exited {
            warn!(pid = self.pid, "watched process exited");
        }
        snapshot.exited = true;
        snapshot.process.cpu = 0.0;
        snapshot.process.status = "Exited".to_string();
        snapshot.children.clear();
        self.last = Some(snapshot.clone());
        snapshot
    }

    fn collect(&self) -> Option<ProcessDetailSnapshot> {
        let total = self.system.total_memory();
        let target = Pid::from_u32(self.pid);
        let process = self.system.process(target)?;

        let mut children: Vec<ProcessRow> = self
            .system
            .processes()
            .values()
            .filter(|p| p.parent() == Some(target))
            .map(|p| process_row(p, total))
            .collect();
        children.sort_by_key(|p| p.pid);

        let disk = process.disk_usage();

        Some(ProcessDetailSnapshot {
            process: process_row(process, total),
            exe: process
                .exe()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            cmdline: process.cmd().join(" "),
            memory: process.memory(),
            virtual_memory: process.virtual_memory(),
            read_bytes: disk.total_read_bytes,
            written_bytes: disk.total_written_bytes,
            children,
            exited: false,
        })
    }
}

impl MetricsProvider for ProcessDetailProvider {
    type Snapshot = ProcessDetailSnapshot;

    async fn sample(&mut self) -> Result<ProcessDetailSnapshot, DashError> {
        self.system.refresh_memory();
        self.system.refresh_processes();

        match self.collect() {
            Some(snapshot) => {
                self.last = Some(snapshot.clone());
                Ok(snapshot)
            }
            None => Ok(self.exited()),
        }
    }
}
