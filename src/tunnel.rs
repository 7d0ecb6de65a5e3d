// Network access to a service port on a monitored server.

use crate::error::ServiceError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Yields a local HTTP base URL that reaches `remote_port` on `server_id`.
/// Implementations may cache tunnels; callers request one on every evaluation.
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    async fn open(&self, server_id: &str, remote_port: u16) -> Result<String, ServiceError>;
}

/// No tunnel at all: the port is reachable directly on the server's address.
#[derive(Debug, Clone, Default)]
pub struct DirectTunnel {
    hosts: HashMap<String, String>,
}

impl DirectTunnel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, server_id: &str, host: &str) -> Self {
        self.hosts.insert(server_id.to_string(), host.to_string());
        self
    }
}

#[async_trait]
impl TunnelProvider for DirectTunnel {
    async fn open(&self, server_id: &str, remote_port: u16) -> Result<String, ServiceError> {
        let host = self
            .hosts
            .get(server_id)
            .ok_or_else(|| ServiceError::Unreachable(format!("unknown server '{server_id}'")))?;
        Ok(format!("http://{host}:{remote_port}"))
    }
}
