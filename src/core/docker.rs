/// Docker integration: container providers and the container action executor

use std::collections::HashMap;
use std::time::Duration;

use bollard::container::{
    InspectContainerOptions, KillContainerOptions, ListContainersOptions, RemoveContainerOptions,
    Stats, StatsOptions, TopOptions,
};
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerStateStatusEnum, ContainerSummary};
use bollard::Docker;
use futures::future::join_all;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::core::actions::{ActionExecutor, ContainerAction};
use crate::core::error::{ActionError, DashError};
use crate::core::metrics::{
    ContainerDetailSnapshot, ContainerListSnapshot, ContainerNetwork, ContainerProcess,
    ContainerRow, MetricsProvider, MountInfo, PortMapping,
};

const SHORT_ID_LEN: usize = 12;
const WAIT_POLL: Duration = Duration::from_millis(100);

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// CPU usage in percent of one core, scaled by the number of cores.
pub fn cpu_percent(total: u64, pre_total: u64, system: u64, pre_system: u64, cpus: u64) -> f64 {
    let cpu_delta = total.saturating_sub(pre_total) as f64;
    let system_delta = system.saturating_sub(pre_system) as f64;
    if cpu_delta > 0.0 && system_delta > 0.0 {
        cpu_delta / system_delta * cpus as f64 * 100.0
    } else {
        0.0
    }
}

/// Per-core usage. None for every core until the daemon has two readings.
pub fn per_cpu_percents(current: &[u64], previous: &[u64], system: u64, pre_system: u64) -> Vec<Option<f64>> {
    let cores = current.len().max(previous.len());
    if current.len() != previous.len() {
        return vec![None; cores];
    }
    current
        .iter()
        .zip(previous)
        .map(|(&now, &before)| Some(cpu_percent(now, before, system, pre_system, cores as u64)))
        .collect()
}

pub fn memory_percent(usage: u64, limit: u64) -> f64 {
    if limit == 0 {
        0.0
    } else {
        usage as f64 / limit as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct StatTotals {
    cpu: f64,
    memory: f64,
    net_rx: u64,
    net_tx: u64,
    block_read: u64,
    block_write: u64,
}

fn stat_totals(stats: &Stats) -> StatTotals {
    let cpus = stats
        .cpu_stats
        .online_cpus
        .filter(|n| *n > 0)
        .or_else(|| stats.cpu_stats.cpu_usage.percpu_usage.as_ref().map(|v| v.len() as u64))
        .unwrap_or(1);

    let cpu = cpu_percent(
        stats.cpu_stats.cpu_usage.total_usage,
        stats.precpu_stats.cpu_usage.total_usage,
        stats.cpu_stats.system_cpu_usage.unwrap_or(0),
        stats.precpu_stats.system_cpu_usage.unwrap_or(0),
        cpus,
    );

    let memory = memory_percent(
        stats.memory_stats.usage.unwrap_or(0),
        stats.memory_stats.limit.unwrap_or(0),
    );

    let (net_rx, net_tx) = stats
        .networks
        .as_ref()
        .map(|nets| {
            nets.values()
                .fold((0, 0), |(rx, tx), n| (rx + n.rx_bytes, tx + n.tx_bytes))
        })
        .unwrap_or((0, 0));

    let (block_read, block_write) = stats
        .blkio_stats
        .io_service_bytes_recursive
        .as_ref()
        .map(|entries| {
            entries.iter().fold((0, 0), |(r, w), e| match e.op.to_lowercase().as_str() {
                "read" => (r + e.value, w),
                "write" => (r, w + e.value),
                _ => (r, w),
            })
        })
        .unwrap_or((0, 0));

    StatTotals { cpu, memory, net_rx, net_tx, block_read, block_write }
}

fn map_action_error(id: &str, err: BollardError) -> ActionError {
    match err {
        BollardError::DockerResponseServerError { status_code: 404, .. } => {
            ActionError::NotFound(id.to_string())
        }
        BollardError::DockerResponseServerError { message, .. } => ActionError::Failed(message),
        other => ActionError::Failed(other.to_string()),
    }
}

fn is_not_found(err: &BollardError) -> bool {
    matches!(err, BollardError::DockerResponseServerError { status_code: 404, .. })
}

/// Where a container should end up once an action has been accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetState {
    Status(ContainerStateStatusEnum),
    Gone,
}

fn target_state(action: ContainerAction) -> TargetState {
    match action {
        ContainerAction::Pause => TargetState::Status(ContainerStateStatusEnum::PAUSED),
        ContainerAction::Unpause | ContainerAction::Restart => {
            TargetState::Status(ContainerStateStatusEnum::RUNNING)
        }
        ContainerAction::Stop | ContainerAction::Kill => {
            TargetState::Status(ContainerStateStatusEnum::EXITED)
        }
        ContainerAction::Remove => TargetState::Gone,
    }
}

#[derive(Clone)]
pub struct DockerManager {
    docker: Docker,
}

impl DockerManager {
    pub fn new() -> Result<Self, DashError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    /// Resolve a user-supplied container id before any view is built.
    pub async fn validate_container(&self, id: &str) -> Result<(), DashError> {
        match self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Err(DashError::InvalidContainer(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>, DashError> {
        let options = Some(ListContainersOptions::<String> {
            all,
            filters: HashMap::new(),
            ..Default::default()
        });
        Ok(self.docker.list_containers(options).await?)
    }

    /// One non-streamed stats reading. Stopped or vanished containers read as zero.
    async fn stats(&self, id: &str) -> Option<Stats> {
        let mut stream = self.docker.stats(
            id,
            Some(StatsOptions {
                stream: false,
                one_shot: false,
            }),
        );
        match stream.next().await {
            Some(Ok(stats)) => Some(stats),
            Some(Err(e)) => {
                debug!(container = id, error = %e, "stats unavailable");
                None
            }
            None => None,
        }
    }

    async fn container_row(&self, summary: ContainerSummary) -> ContainerRow {
        let id = summary.id.unwrap_or_default();
        let totals = self.stats(&id).await.map(|s| stat_totals(&s)).unwrap_or_default();

        ContainerRow {
            id: short_id(&id),
            image: summary.image.unwrap_or_default(),
            name: summary
                .names
                .unwrap_or_default()
                .iter()
                .map(|n| n.trim_start_matches('/'))
                .collect::<Vec<_>>()
                .join(","),
            status: summary.status.unwrap_or_default(),
            state: summary.state.unwrap_or_default(),
            cpu: totals.cpu,
            memory_percent: totals.memory,
            net_rx: totals.net_rx,
            net_tx: totals.net_tx,
            block_read: totals.block_read,
            block_write: totals.block_write,
        }
    }

    async fn container_processes(&self, id: &str) -> Vec<ContainerProcess> {
        let top = match self
            .docker
            .top_processes(id, Some(TopOptions { ps_args: "-ef" }))
            .await
        {
            Ok(top) => top,
            // Paused and stopped containers have nothing to list.
            Err(_) => return Vec::new(),
        };

        let titles = top.titles.unwrap_or_default();
        let column = |name: &str| titles.iter().position(|t| t == name);
        let (uid, pid, cmd) = (column("UID"), column("PID"), column("CMD"));

        top.processes
            .unwrap_or_default()
            .into_iter()
            .map(|row| {
                let cell = |idx: Option<usize>| {
                    idx.and_then(|i| row.get(i).cloned()).unwrap_or_default()
                };
                ContainerProcess {
                    uid: cell(uid),
                    pid: cell(pid),
                    command: cell(cmd),
                }
            })
            .collect()
    }

    async fn wait_for(&self, id: &str, target: TargetState) -> Result<(), ActionError> {
        loop {
            match self
                .docker
                .inspect_container(id, None::<InspectContainerOptions>)
                .await
            {
                Ok(info) => {
                    let status = info.state.and_then(|s| s.status);
                    if let (TargetState::Status(want), Some(have)) = (&target, status.as_ref()) {
                        if want == have {
                            return Ok(());
                        }
                    }
                }
                Err(e) if is_not_found(&e) && target == TargetState::Gone => return Ok(()),
                Err(e) => return Err(map_action_error(id, e)),
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }
}

impl ActionExecutor for DockerManager {
    /// Issue the action and wait until the daemon reports the resulting state.
    async fn apply(&self, action: ContainerAction, entity: &str) -> Result<(), ActionError> {
        info!(container = entity, %action, "applying container action");

        let issued = match action {
            ContainerAction::Pause => self.docker.pause_container(entity).await,
            ContainerAction::Unpause => self.docker.unpause_container(entity).await,
            ContainerAction::Restart => self.docker.restart_container(entity, None).await,
            ContainerAction::Stop => self.docker.stop_container(entity, None).await,
            ContainerAction::Kill => {
                self.docker
                    .kill_container(entity, None::<KillContainerOptions<String>>)
                    .await
            }
            ContainerAction::Remove => {
                self.docker
                    .remove_container(
                        entity,
                        Some(RemoveContainerOptions {
                            force: true,
                            v: true,
                            ..Default::default()
                        }),
                    )
                    .await
            }
        };

        if let Err(e) = issued {
            let err = map_action_error(entity, e);
            warn!(container = entity, %action, error = %err, "container action failed");
            return Err(err);
        }

        self.wait_for(entity, target_state(action)).await
    }
}

/// Every container (or only running ones) with live stats
pub struct ContainerListProvider {
    docker: DockerManager,
    all: bool,
}

impl ContainerListProvider {
    pub fn new(docker: DockerManager, all: bool) -> Self {
        Self { docker, all }
    }
}

impl MetricsProvider for ContainerListProvider {
    type Snapshot = ContainerListSnapshot;

    async fn sample(&mut self) -> Result<ContainerListSnapshot, DashError> {
        let summaries = self.docker.list(self.all).await?;
        let docker = &self.docker;
        let containers = join_all(summaries.into_iter().map(|s| docker.container_row(s))).await;
        Ok(ContainerListSnapshot { containers })
    }
}

/// One container in depth
pub struct ContainerDetailProvider {
    docker: DockerManager,
    id: String,
}

impl ContainerDetailProvider {
    pub fn new(docker: DockerManager, id: impl Into<String>) -> Self {
        Self { docker, id: id.into() }
    }
}

impl MetricsProvider for ContainerDetailProvider {
    type Snapshot = ContainerDetailSnapshot;

    async fn sample(&mut self) -> Result<ContainerDetailSnapshot, DashError> {
        let id = self.id.as_str();
        let info = match self
            .docker
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
        {
            Ok(info) => info,
            // Validated at startup, so a 404 here means it was removed while watched.
            Err(e) if is_not_found(&e) => {
                return Err(DashError::Provider(format!("container {} no longer exists", id)))
            }
            Err(e) => return Err(e.into()),
        };

        let stats = self.docker.stats(id).await;
        let totals = stats.as_ref().map(stat_totals).unwrap_or_default();
        let per_cpu = stats
            .as_ref()
            .map(|s| {
                per_cpu_percents(
                    s.cpu_stats.cpu_usage.percpu_usage.as_deref().unwrap_or(&[]),
                    s.precpu_stats.cpu_usage.percpu_usage.as_deref().unwrap_or(&[]),
                    s.cpu_stats.system_cpu_usage.unwrap_or(0),
                    s.precpu_stats.system_cpu_usage.unwrap_or(0),
                )
            })
            .unwrap_or_default();

        let state = info.state.as_ref();
        let summary = ContainerRow {
            id: short_id(info.id.as_deref().unwrap_or(id)),
            image: info
                .config
                .as_ref()
                .and_then(|c| c.image.clone())
                .unwrap_or_default(),
            name: info
                .name
                .as_deref()
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            status: match state {
                Some(s) if s.running == Some(true) => {
                    format!("Up since {}", s.started_at.as_deref().unwrap_or("-"))
                }
                Some(s) => format!(
                    "Exited ({}) at {}",
                    s.exit_code.unwrap_or_default(),
                    s.finished_at.as_deref().unwrap_or("-")
                ),
                None => String::new(),
            },
            state: state
                .and_then(|s| s.status.as_ref())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            cpu: totals.cpu,
            memory_percent: totals.memory,
            net_rx: totals.net_rx,
            net_tx: totals.net_tx,
            block_read: totals.block_read,
            block_write: totals.block_write,
        };

        let mounts = info
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(|m| MountInfo {
                source: m.source.unwrap_or_default(),
                destination: m.destination.unwrap_or_default(),
                mode: m.mode.unwrap_or_default(),
            })
            .collect();

        let settings = info.network_settings.unwrap_or_default();
        let mut networks: Vec<ContainerNetwork> = settings
            .networks
            .unwrap_or_default()
            .into_iter()
            .map(|(name, endpoint)| ContainerNetwork {
                name,
                ip_address: endpoint.ip_address.unwrap_or_default(),
                gateway: endpoint.gateway.unwrap_or_default(),
            })
            .collect();
        networks.sort_by(|a, b| a.name.cmp(&b.name));

        let mut ports: Vec<PortMapping> = Vec::new();
        for (container_port, bindings) in settings.ports.unwrap_or_default() {
            match bindings {
                Some(bindings) if !bindings.is_empty() => {
                    for b in bindings {
                        ports.push(PortMapping {
                            host: format!(
                                "{}:{}",
                                b.host_ip.unwrap_or_default(),
                                b.host_port.unwrap_or_default()
                            ),
                            container: container_port.clone(),
                        });
                    }
                }
                _ => ports.push(PortMapping {
                    host: "-".to_string(),
                    container: container_port,
                }),
            }
        }
        ports.sort_by(|a, b| a.container.cmp(&b.container));

        let processes = self.docker.container_processes(id).await;

        Ok(ContainerDetailSnapshot {
            summary,
            pid: info.state.as_ref().and_then(|s| s.pid),
            per_cpu,
            mounts,
            networks,
            ports,
            processes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_percent() {
        assert_eq!(cpu_percent(200, 100, 2000, 1000, 4), 40.0);
        assert_eq!(cpu_percent(100, 100, 2000, 1000, 4), 0.0);
        // Counter reset must not underflow.
        assert_eq!(cpu_percent(50, 100, 2000, 1000, 4), 0.0);
    }

    #[test]
    fn test_per_cpu_needs_matching_readings() {
        assert_eq!(per_cpu_percents(&[0], &[0, 0], 10, 0), vec![None, None]);
        assert_eq!(
            per_cpu_percents(&[50, 10], &[0, 10], 100, 0),
            vec![Some(100.0), Some(0.0)]
        );
        assert!(per_cpu_percents(&[], &[], 100, 0).is_empty());
    }

    #[test]
    fn test_memory_percent_without_limit() {
        assert_eq!(memory_percent(512, 0), 0.0);
        assert_eq!(memory_percent(256, 1024), 25.0);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_not_found_maps_to_distinct_error() {
        let err = BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: abc123".into(),
        };
        assert_eq!(map_action_error("abc123", err), ActionError::NotFound("abc123".into()));

        let err = BollardError::DockerResponseServerError {
            status_code: 409,
            message: "Container abc123 is not running".into(),
        };
        assert_eq!(
            map_action_error("abc123", err),
            ActionError::Failed("Container abc123 is not running".into())
        );
    }

    #[test]
    fn test_target_states() {
        assert_eq!(
            target_state(ContainerAction::Pause),
            TargetState::Status(ContainerStateStatusEnum::PAUSED)
        );
        assert_eq!(target_state(ContainerAction::Remove), TargetState::Gone);
    }

    #[tokio::test]
    async fn test_unknown_container_never_validates() {
        let Ok(manager) = DockerManager::new() else {
            return;
        };
        // Without a daemon this is a connection error rather than a missing container.
        match manager.validate_container("definitely-not-a-container").await {
            Err(DashError::InvalidContainer(id)) => assert_eq!(id, "definitely-not-a-container"),
            Err(DashError::Docker(_)) => {}
            other => panic!("unexpected validation result {:?}", other),
        }
    }
}
