// Host and container sampling: raw counters in, rate-based snapshots out.

mod counters;
mod linux;

pub use counters::{
    CounterDelta, CounterStore, RawCounterSample, container_cpu_percent, cpu_percent,
};

use crate::docker_repo::{ContainerReading, DockerRepo};
use crate::models::{ContainerSnapshot, ProcessInfo, SystemSnapshot};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::{Components, Disks, Networks, ProcessesToUpdate, System};
use tracing::{instrument, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const CONTAINER_PREFIX: &str = "container:";

/// Owns every OS handle and the retained counter samples. Each read degrades a
/// failing field to its default instead of failing the whole snapshot.
pub struct Sampler {
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
    networks: Arc<Mutex<Networks>>,
    components: Arc<Mutex<Components>>,
    counters: Arc<Mutex<CounterStore>>,
    docker: DockerRepo,
    /// Logical CPUs, at least 1. Fixed for the life of the process.
    core_count: u32,
    host_memory: u64,
}

impl Sampler {
    pub fn new(docker: DockerRepo) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();
        let core_count = sys.cpus().len().max(1) as u32;
        let host_memory = sys.total_memory();
        let sampler = Self {
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
            networks: Arc::new(Mutex::new(Networks::new_with_refreshed_list())),
            components: Arc::new(Mutex::new(Components::new_with_refreshed_list())),
            counters: Arc::new(Mutex::new(CounterStore::new())),
            docker,
            core_count,
            host_memory,
        };
        sampler.prime();
        sampler
    }

    pub fn docker(&self) -> &DockerRepo {
        &self.docker
    }

    /// Counters currently retained; `None` while a sampling pass holds the store.
    pub fn tracked_counters(&self) -> Option<usize> {
        self.counters.try_lock().ok().map(|c| c.len())
    }

    /// Take the baseline readings so the first tick already yields rates.
    fn prime(&self) {
        let now = Instant::now();
        if let Ok(mut counters) = self.counters.lock() {
            if let Some(t) = linux::read_cpu_times() {
                counters.record("host:cpu_busy", t.busy, now);
                counters.record("host:cpu_total", t.total, now);
            }
            if let Ok(networks) = self.networks.lock() {
                let (rx, tx) = network_totals(&networks);
                counters.record("host:net_rx", rx, now);
                counters.record("host:net_tx", tx, now);
            }
        }
    }

    /// System snapshot and container list, read concurrently.
    pub async fn sample(&self) -> (SystemSnapshot, Vec<ContainerSnapshot>) {
        tokio::join!(self.sample_system(), self.sample_containers())
    }

    #[instrument(skip(self), fields(repo = "sampler", operation = "sample_system"))]
    pub async fn sample_system(&self) -> SystemSnapshot {
        let sys = self.sys.clone();
        let disks = self.disks.clone();
        let networks = self.networks.clone();
        let components = self.components.clone();
        let counters = self.counters.clone();
        let result = tokio::task::spawn_blocking(move || {
            read_system(&sys, &disks, &networks, &components, &counters)
        })
        .await;
        match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, operation = "sample_system", "sampler task join failed");
                SystemSnapshot::default()
            }
        }
    }

    #[instrument(skip(self), fields(repo = "sampler", operation = "sample_containers"))]
    pub async fn sample_containers(&self) -> Vec<ContainerSnapshot> {
        let readings = self.docker.list_readings().await;
        let counters = self.counters.clone();
        let (core_count, host_memory) = (self.core_count, self.host_memory);
        let result = tokio::task::spawn_blocking(move || {
            record_containers(&counters, readings, core_count, host_memory)
        })
        .await;
        result.unwrap_or_else(|e| {
            warn!(error = %e, operation = "sample_containers", "sampler task join failed");
            Vec::new()
        })
    }

    /// Containers from the listing alone: no stats read, usage fields stay 0.
    #[instrument(skip(self), fields(repo = "sampler", operation = "list_containers"))]
    pub async fn list_containers(&self) -> Vec<ContainerSnapshot> {
        self.docker
            .list_plain()
            .await
            .into_iter()
            .map(|r| to_snapshot(r, 0.0, self.host_memory))
            .collect()
    }

    /// Processes sorted by CPU usage, highest first.
    #[instrument(skip(self), fields(repo = "sampler", operation = "top_processes"))]
    pub async fn top_processes(&self, limit: usize) -> Vec<ProcessInfo> {
        let sys = self.sys.clone();
        let result = tokio::task::spawn_blocking(move || {
            let Ok(mut sys) = sys.lock() else {
                return Vec::new();
            };
            sys.refresh_processes(ProcessesToUpdate::All, true);
            let mut procs: Vec<ProcessInfo> = sys
                .processes()
                .iter()
                .map(|(pid, p)| ProcessInfo {
                    pid: pid.as_u32(),
                    name: p.name().to_string_lossy().into_owned(),
                    cpu_percent: p.cpu_usage() as f64,
                    memory_mb: p.memory() as f64 / BYTES_PER_MB,
                })
                .collect();
            procs.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
            procs.truncate(limit);
            procs
        })
        .await;
        result.unwrap_or_else(|e| {
            warn!(error = %e, operation = "top_processes", "sampler task join failed");
            Vec::new()
        })
    }

    /// Send SIGKILL (or the platform equivalent). `None` when no such process exists.
    pub async fn kill_process(&self, pid: u32) -> Option<bool> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys.lock().ok()?;
            let pid = sysinfo::Pid::from_u32(pid);
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            sys.process(pid).map(|p| p.kill())
        })
        .await
        .ok()
        .flatten()
    }
}

fn network_totals(networks: &Networks) -> (u64, u64) {
    networks.list().values().fold((0u64, 0u64), |(rx, tx), data| {
        (rx + data.total_received(), tx + data.total_transmitted())
    })
}

fn read_system(
    sys: &Mutex<System>,
    disks: &Mutex<Disks>,
    networks: &Mutex<Networks>,
    components: &Mutex<Components>,
    counters: &Mutex<CounterStore>,
) -> SystemSnapshot {
    let now = Instant::now();
    let mut snapshot = SystemSnapshot {
        uptime: System::uptime(),
        ..Default::default()
    };

    let raw_cpu = linux::read_cpu_times();
    match sys.lock() {
        Ok(mut sys) => {
            sys.refresh_memory();
            sys.refresh_cpu_usage();
            snapshot.core_count = sys.cpus().len() as u32;
            snapshot.memory_total = sys.total_memory();
            snapshot.memory_used = sys.total_memory().saturating_sub(sys.available_memory());
            if raw_cpu.is_none() {
                snapshot.cpu_percent = (sys.global_cpu_usage() as f64).clamp(0.0, 100.0);
            }
        }
        Err(e) => warn!(error = %e, operation = "read_memory", "sysinfo lock poisoned"),
    }

    match disks.lock() {
        Ok(mut disks) => {
            disks.refresh(false);
            let list = disks.list();
            let root: Vec<_> = list
                .iter()
                .filter(|d| d.mount_point() == std::path::Path::new("/"))
                .collect();
            let chosen: Vec<_> = if root.is_empty() {
                list.iter().collect()
            } else {
                root
            };
            for d in chosen {
                snapshot.disk_total += d.total_space();
                snapshot.disk_used += d.total_space().saturating_sub(d.available_space());
            }
        }
        Err(e) => warn!(error = %e, operation = "read_disks", "sysinfo disks lock poisoned"),
    }

    match components.lock() {
        Ok(mut components) => {
            components.refresh(false);
            snapshot.temperature = components
                .list()
                .iter()
                .filter_map(|c| c.temperature())
                .filter(|t| t.is_finite() && *t > 0.0)
                .fold(0.0f32, f32::max) as f64;
        }
        Err(e) => warn!(error = %e, operation = "read_temperature", "sysinfo components lock poisoned"),
    }

    let net = match networks.lock() {
        Ok(mut networks) => {
            networks.refresh(true);
            Some(network_totals(&networks))
        }
        Err(e) => {
            warn!(error = %e, operation = "read_network", "sysinfo networks lock poisoned");
            None
        }
    };

    match counters.lock() {
        Ok(mut counters) => {
            if let Some(t) = raw_cpu {
                let busy = counters.record("host:cpu_busy", t.busy, now);
                let total = counters.record("host:cpu_total", t.total, now);
                snapshot.cpu_percent = cpu_percent(busy, total);
            }
            if let Some((rx, tx)) = net {
                snapshot.network_download = counters
                    .record("host:net_rx", rx, now)
                    .map_or(0.0, |d| d.per_second());
                snapshot.network_upload = counters
                    .record("host:net_tx", tx, now)
                    .map_or(0.0, |d| d.per_second());
            }
        }
        Err(e) => warn!(error = %e, operation = "record_counters", "counter store lock poisoned"),
    }

    snapshot
}

fn record_containers(
    counters: &Mutex<CounterStore>,
    readings: Vec<ContainerReading>,
    core_count: u32,
    host_memory: u64,
) -> Vec<ContainerSnapshot> {
    let now = Instant::now();
    let Ok(mut counters) = counters.lock() else {
        warn!(operation = "sample_containers", "counter store lock poisoned");
        return readings
            .into_iter()
            .map(|r| to_snapshot(r, 0.0, host_memory))
            .collect();
    };
    let snapshots: Vec<ContainerSnapshot> = readings
        .into_iter()
        .map(|r| {
            let cpu = r.usage.as_ref().map_or(0.0, |u| {
                let key = format!("{CONTAINER_PREFIX}{}:", r.full_id);
                let container = counters.record(&format!("{key}cpu"), u.cpu_total_ns, now);
                let system = u
                    .system_cpu_ns
                    .and_then(|ns| counters.record(&format!("{key}system_cpu"), ns, now));
                let cores = u.online_cpus.filter(|c| *c > 0).unwrap_or(core_count);
                container_cpu_percent(container, system, cores)
            });
            to_snapshot(r, cpu, host_memory)
        })
        .collect();
    let live: Vec<&str> = snapshots.iter().map(|s| s.id.as_str()).collect();
    counters.retain_prefixed(CONTAINER_PREFIX, |key| {
        key[CONTAINER_PREFIX.len()..]
            .get(..12)
            .is_some_and(|short| live.contains(&short))
    });
    snapshots
}

fn to_snapshot(r: ContainerReading, cpu_percent: f64, host_memory: u64) -> ContainerSnapshot {
    let usage = r.usage.unwrap_or_default();
    // Docker reports the host's memory as the limit when none is set.
    let limit = if host_memory > 0 && usage.memory_limit_bytes >= host_memory {
        0
    } else {
        usage.memory_limit_bytes
    };
    ContainerSnapshot {
        id: r.full_id.chars().take(12).collect(),
        name: r.name,
        image: r.image,
        status: r.status,
        cpu_percent,
        memory_usage_mb: usage.memory_usage_bytes as f64 / BYTES_PER_MB,
        memory_limit_mb: limit as f64 / BYTES_PER_MB,
        network_rx: usage.network_rx_bytes,
        network_tx: usage.network_tx_bytes,
        block_read: usage.block_read_bytes,
        block_write: usage.block_write_bytes,
        pids: usage.pids,
        started_at: r.started_at,
        ports: r.ports,
        restart_count: r.restart_count,
        health: r.health,
    }
}
