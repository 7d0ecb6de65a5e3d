// Docker container models

use serde::{Deserialize, Serialize};

/// Container status as reported to clients; serializes lowercase (e.g. "running").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
    Restarting,
}

impl ContainerStatus {
    /// Map a Docker state string ("running", "exited", ...). Unknown states count as stopped.
    pub fn from_docker(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "running" => ContainerStatus::Running,
            "restarting" => ContainerStatus::Restarting,
            _ => ContainerStatus::Stopped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Starting,
    #[default]
    #[serde(other)]
    None,
}

impl HealthStatus {
    pub fn from_docker(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "healthy" => HealthStatus::Healthy,
            "unhealthy" => HealthStatus::Unhealthy,
            "starting" => HealthStatus::Starting,
            _ => HealthStatus::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub private_port: u16,
    pub public_port: Option<u16>,
    #[serde(rename = "type")]
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSnapshot {
    /// Short (12 char) container id.
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    /// Relative to one core; may exceed 100 on multi-core hosts.
    pub cpu_percent: f64,
    pub memory_usage_mb: f64,
    /// 0 = unlimited.
    pub memory_limit_mb: f64,
    pub network_rx: u64,
    pub network_tx: u64,
    pub block_read: u64,
    pub block_write: u64,
    pub pids: u64,
    /// RFC 3339; `null` when the container is not running.
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortMapping>>,
    #[serde(default)]
    pub restart_count: u64,
    #[serde(default)]
    pub health: HealthStatus,
}
