// Detected third-party services running in containers

use serde::{Deserialize, Serialize};

use super::ContainerStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSnapshot {
    pub plugin_id: String,
    pub name: String,
    pub container_id: String,
    pub container_name: String,
    pub image: String,
    pub status: ContainerStatus,
    /// Well-known port the plugin talks to.
    pub port: u16,
    /// A credential is stored for this plugin on this server.
    pub configured: bool,
}
