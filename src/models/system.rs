// Host-level snapshot and process models

use serde::{Deserialize, Serialize};

/// Point-in-time OS metrics. Built once per sampling tick, never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    pub cpu_percent: f64,
    pub core_count: u32,
    /// Degrees Celsius; 0 when no sensor is readable.
    pub temperature: f64,
    pub memory_used: u64,
    pub memory_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    /// Bytes/sec summed across interfaces.
    pub network_download: f64,
    /// Bytes/sec summed across interfaces.
    pub network_upload: f64,
    pub uptime: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_mb: f64,
}
