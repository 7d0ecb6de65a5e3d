// Shared test helpers
#![allow(dead_code)]

use hostpulse::agent::{AgentCommand, AgentControl};
use hostpulse::config::AppConfig;
use hostpulse::credentials::{CredentialStore, MemoryCredentialStore};
use hostpulse::docker_repo::DockerRepo;
use hostpulse::models::{ContainerSnapshot, ContainerStatus, HealthStatus};
use hostpulse::plugins::default_registry;
use hostpulse::routes::AppState;
use hostpulse::sampler::Sampler;
use hostpulse::services::ServiceDetector;
use hostpulse::stream::{StreamCadence, StreamMultiplexer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const TEST_SERVER_ID: &str = "test-host";

pub const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "127.0.0.1"
server_id = "test-host"

[publishing]
system_interval_ms = 50
docker_interval_ms = 50
services_interval_ms = 50
keepalive_secs = 30
channel_capacity = 8

[monitoring]
top_process_count = 5
stats_log_interval_secs = 60
"#;

pub fn test_config() -> AppConfig {
    AppConfig::load_from_str(TEST_CONFIG).unwrap()
}

pub fn test_config_with_token(token: &str) -> AppConfig {
    let mut config = test_config();
    config.server.auth_token = Some(token.to_string());
    config
}

/// Full router state without Docker; the agent command receiver is returned alongside.
pub fn test_state(config: AppConfig) -> (AppState, mpsc::Receiver<AgentCommand>) {
    let registry = Arc::new(default_registry());
    let credentials: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
    let sampler = Arc::new(Sampler::new(DockerRepo::disabled()));
    let services = Arc::new(ServiceDetector::new(
        registry.clone(),
        credentials.clone(),
        TEST_SERVER_ID.into(),
    ));
    let multiplexer = Arc::new(StreamMultiplexer::new(
        sampler.clone(),
        services.clone(),
        StreamCadence {
            system: Duration::from_millis(50),
            docker: Duration::from_millis(50),
            services: Duration::from_millis(50),
            keepalive: Duration::from_secs(30),
            channel_capacity: 8,
        },
        config.monitoring.top_process_count,
    ));
    let (agent, agent_rx) = AgentControl::new();
    let state = AppState {
        sampler,
        multiplexer,
        services,
        registry,
        credentials,
        agent,
        server_id: TEST_SERVER_ID.into(),
        config,
    };
    (state, agent_rx)
}

pub fn container(id: &str, image: &str, status: ContainerStatus) -> ContainerSnapshot {
    ContainerSnapshot {
        id: id.into(),
        name: format!("{id}-name"),
        image: image.into(),
        status,
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

/// n8n execution as served by `/api/v1/executions`, started `secs_ago` before now.
pub fn execution_json(
    id: &str,
    status: &str,
    secs_ago: i64,
    workflow_id: Option<&str>,
    inline_name: Option<&str>,
) -> serde_json::Value {
    let started = chrono::Utc::now() - chrono::Duration::seconds(secs_ago);
    let mut value = serde_json::json!({
        "id": id,
        "status": status,
        "startedAt": started.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
    });
    if let Some(wf) = workflow_id {
        value["workflowId"] = serde_json::json!(wf);
    }
    if let Some(name) = inline_name {
        value["workflowData"] = serde_json::json!({ "name": name });
    }
    value
}
