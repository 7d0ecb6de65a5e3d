// Detect plugin-backed services among the containers of this host.

use crate::credentials::{CredentialStore, credential_key};
use crate::models::{ContainerSnapshot, ServiceSnapshot};
use crate::plugins::PluginRegistry;
use std::sync::Arc;

pub struct ServiceDetector {
    registry: Arc<PluginRegistry>,
    credentials: Arc<dyn CredentialStore>,
    server_id: String,
}

impl ServiceDetector {
    pub fn new(
        registry: Arc<PluginRegistry>,
        credentials: Arc<dyn CredentialStore>,
        server_id: String,
    ) -> Self {
        Self {
            registry,
            credentials,
            server_id,
        }
    }

    /// One snapshot per container whose image some plugin claims.
    pub fn detect(&self, containers: &[ContainerSnapshot]) -> Vec<ServiceSnapshot> {
        containers
            .iter()
            .filter_map(|c| {
                let plugin = self.registry.resolve(&c.image)?;
                let configured = plugin.credential_purpose().is_none_or(|purpose| {
                    self.credentials
                        .get(&credential_key(plugin.id(), purpose, &self.server_id))
                        .is_some_and(|s| !s.is_empty())
                });
                Some(ServiceSnapshot {
                    plugin_id: plugin.id().to_string(),
                    name: plugin.display_name().to_string(),
                    container_id: c.id.clone(),
                    container_name: c.name.clone(),
                    image: c.image.clone(),
                    status: c.status,
                    port: plugin.default_port(),
                    configured,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::models::{ContainerStatus, HealthStatus};
    use crate::plugins::default_registry;

    fn container(id: &str, image: &str) -> ContainerSnapshot {
        ContainerSnapshot {
            id: id.into(),
            name: format!("{id}-name"),
            image: image.into(),
            status: ContainerStatus::Running,
            cpu_percent: 0.0,
            memory_usage_mb: 0.0,
            memory_limit_mb: 0.0,
            network_rx: 0,
            network_tx: 0,
            block_read: 0,
            block_write: 0,
            pids: 0,
            started_at: None,
            ports: None,
            restart_count: 0,
            health: HealthStatus::None,
        }
    }

    #[test]
    fn detects_only_claimed_images_and_reports_configuration() {
        let store = Arc::new(MemoryCredentialStore::new());
        let detector = ServiceDetector::new(
            Arc::new(default_registry()),
            store.clone(),
            "nas".into(),
        );
        let containers = vec![
            container("a", "postgres:16"),
            container("b", "N8NIO/N8N:latest"),
        ];

        let found = detector.detect(&containers);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].plugin_id, "n8n");
        assert_eq!(found[0].container_id, "b");
        assert_eq!(found[0].port, 5678);
        assert!(!found[0].configured);

        store.set("n8n-apikey-nas", "secret").unwrap();
        assert!(detector.detect(&containers)[0].configured);
    }
}
