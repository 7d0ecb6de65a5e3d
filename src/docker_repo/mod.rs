// Docker container discovery, stats and lifecycle via bollard

mod stats;

pub(crate) use stats::ContainerUsage;

use crate::models::{ContainerStatus, HealthStatus, PortMapping};
use bollard::Docker;
use bollard::errors::Error as BollardError;
use bollard::query_parameters::{
    InspectContainerOptions, ListContainersOptions, RestartContainerOptions,
    StartContainerOptions, StatsOptions, StopContainerOptions,
};
use bollard::models::ContainerSummary;
use futures_util::StreamExt;
use futures_util::future::join_all;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Rate limit for "Docker unavailable" warnings; the sampler polls every few seconds.
const UNAVAILABLE_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Docker-epoch placeholder reported for never-started containers.
const ZERO_TIME_PREFIX: &str = "0001-01-01";

/// Everything the sampler needs about one container, before rate derivation.
#[derive(Debug, Clone)]
pub(crate) struct ContainerReading {
    pub full_id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    pub started_at: Option<String>,
    pub ports: Option<Vec<PortMapping>>,
    pub restart_count: u64,
    pub health: HealthStatus,
    /// Present only for running containers whose stats read succeeded.
    pub usage: Option<ContainerUsage>,
}

#[derive(Debug, thiserror::Error)]
pub enum DockerActionError {
    #[error("docker is not available")]
    Unavailable,
    #[error("no such container: {0}")]
    NotFound(String),
    #[error("docker error: {0}")]
    Failed(String),
}

impl From<BollardError> for DockerActionError {
    fn from(err: BollardError) -> Self {
        match err {
            BollardError::DockerResponseServerError {
                status_code: 404,
                message,
            } => DockerActionError::NotFound(message),
            BollardError::DockerResponseServerError { message, .. } => {
                DockerActionError::Failed(message)
            }
            // Anything else never got an answer from the daemon.
            other => {
                debug!(error = %other, "docker request failed in transport");
                DockerActionError::Unavailable
            }
        }
    }
}

pub struct DockerRepo {
    docker: Option<Docker>,
    last_unavailable_warn: Mutex<Option<Instant>>,
}

impl DockerRepo {
    /// Never fails: without a usable socket the repo reports no containers.
    pub fn connect() -> Self {
        let docker = match Docker::connect_with_unix_defaults() {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(error = %e, "Docker unavailable; container metrics disabled");
                None
            }
        };
        Self {
            docker,
            last_unavailable_warn: Mutex::new(None),
        }
    }

    /// A repo that never talks to Docker (tests, hosts without a daemon).
    pub fn disabled() -> Self {
        Self {
            docker: None,
            last_unavailable_warn: Mutex::new(None),
        }
    }

    fn warn_unavailable(&self, err: &BollardError) {
        let Ok(mut last) = self.last_unavailable_warn.lock() else {
            return;
        };
        if last.is_none_or(|t| t.elapsed() >= UNAVAILABLE_WARN_INTERVAL) {
            warn!(error = %err, operation = "list_containers", "Docker unavailable; reporting no containers");
            *last = Some(Instant::now());
        }
    }

    /// All containers (running or not) with inspect data and, when running, one stats read.
    #[instrument(skip(self), fields(repo = "docker", operation = "list_readings"))]
    pub(crate) async fn list_readings(&self) -> Vec<ContainerReading> {
        let Some(docker) = &self.docker else {
            return Vec::new();
        };
        let summaries = self.list_summaries(docker).await;
        join_all(summaries.into_iter().map(|c| read_container(docker, c))).await
    }

    /// Listing fields only: no inspect, no stats, no usage.
    #[instrument(skip(self), fields(repo = "docker", operation = "list_plain"))]
    pub(crate) async fn list_plain(&self) -> Vec<ContainerReading> {
        let Some(docker) = &self.docker else {
            return Vec::new();
        };
        self.list_summaries(docker)
            .await
            .into_iter()
            .map(summary_reading)
            .collect()
    }

    async fn list_summaries(&self, docker: &Docker) -> Vec<ContainerSummary> {
        let options = ListContainersOptions {
            all: true,
            ..Default::default()
        };
        match docker.list_containers(Some(options)).await {
            Ok(c) => c,
            Err(e) => {
                self.warn_unavailable(&e);
                Vec::new()
            }
        }
    }

    pub async fn start(&self, id: &str) -> Result<(), DockerActionError> {
        let docker = self.docker.as_ref().ok_or(DockerActionError::Unavailable)?;
        docker
            .start_container(id, None::<StartContainerOptions>)
            .await?;
        Ok(())
    }

    pub async fn stop(&self, id: &str) -> Result<(), DockerActionError> {
        let docker = self.docker.as_ref().ok_or(DockerActionError::Unavailable)?;
        docker.stop_container(id, None::<StopContainerOptions>).await?;
        Ok(())
    }

    pub async fn restart(&self, id: &str) -> Result<(), DockerActionError> {
        let docker = self.docker.as_ref().ok_or(DockerActionError::Unavailable)?;
        docker
            .restart_container(id, None::<RestartContainerOptions>)
            .await?;
        Ok(())
    }
}

fn summary_reading(c: ContainerSummary) -> ContainerReading {
    let full_id = c.id.clone().unwrap_or_default();
    let name = c
        .names
        .as_ref()
        .and_then(|n| n.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| full_id.chars().take(12).collect());
    let image = c.image.clone().unwrap_or_default();
    let state = c.state.as_ref().map(|s| s.to_string()).unwrap_or_default();
    let status = ContainerStatus::from_docker(&state);
    let ports = c.ports.as_ref().map(|ports| {
        ports
            .iter()
            .map(|p| PortMapping {
                private_port: p.private_port,
                public_port: p.public_port,
                protocol: p
                    .typ
                    .as_ref()
                    .map(|t| t.to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "tcp".into()),
            })
            .collect()
    });
    ContainerReading {
        full_id,
        name,
        image,
        status,
        started_at: None,
        ports,
        restart_count: 0,
        health: HealthStatus::None,
        usage: None,
    }
}

async fn read_container(docker: &Docker, c: ContainerSummary) -> ContainerReading {
    let mut reading = summary_reading(c);

    match docker
        .inspect_container(&reading.full_id, None::<InspectContainerOptions>)
        .await
    {
        Ok(info) => {
            reading.restart_count = info.restart_count.unwrap_or(0).max(0) as u64;
            if let Some(st) = info.state.as_ref() {
                reading.health = st
                    .health
                    .as_ref()
                    .and_then(|h| h.status.as_ref())
                    .map(|s| HealthStatus::from_docker(&s.to_string()))
                    .unwrap_or_default();
                reading.started_at = st
                    .started_at
                    .clone()
                    .filter(|s| !s.is_empty() && !s.starts_with(ZERO_TIME_PREFIX));
            }
        }
        Err(e) => debug!(container = %reading.name, error = %e, "inspect_container failed"),
    }

    if reading.status == ContainerStatus::Running {
        reading.usage = read_usage(docker, &reading.full_id, &reading.name).await;
    } else {
        reading.started_at = None;
    }
    reading
}

async fn read_usage(docker: &Docker, id: &str, name: &str) -> Option<ContainerUsage> {
    let options = StatsOptions {
        stream: false,
        one_shot: true,
    };
    match docker.stats(id, Some(options)).next().await {
        Some(Ok(s)) => stats::process_statistics(&s),
        Some(Err(e)) => {
            debug!(container = %name, error = %e, "stats read failed");
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(value: serde_json::Value) -> ContainerSummary {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn summary_reading_uses_listing_fields_only() {
        let r = summary_reading(summary(serde_json::json!({
            "Id": "0123456789abcdef0123",
            "Names": ["/web"],
            "Image": "nginx:latest",
            "State": "running",
            "Ports": [
                { "PrivatePort": 80, "PublicPort": 8080, "Type": "tcp" },
                { "PrivatePort": 53, "Type": "" }
            ]
        })));
        assert_eq!(r.name, "web");
        assert_eq!(r.image, "nginx:latest");
        assert_eq!(r.status, ContainerStatus::Running);
        let ports = r.ports.expect("ports");
        assert_eq!(ports[0].public_port, Some(8080));
        assert_eq!(ports[1].public_port, None);
        assert_eq!(ports[1].protocol, "tcp");
        assert!(r.usage.is_none());
        assert!(r.started_at.is_none());
        assert_eq!(r.restart_count, 0);
    }

    #[test]
    fn summary_reading_falls_back_to_short_id_for_name() {
        let r = summary_reading(summary(serde_json::json!({
            "Id": "0123456789abcdef0123",
            "State": "exited"
        })));
        assert_eq!(r.name, "0123456789ab");
        assert_eq!(r.status, ContainerStatus::Stopped);
        assert!(r.ports.is_none());
    }
}
