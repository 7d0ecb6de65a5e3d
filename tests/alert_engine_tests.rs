// Alert evaluation engine: every failure path resolves to Ok

mod common;

use async_trait::async_trait;
use hostpulse::alerts::AlertEvaluationEngine;
use hostpulse::credentials::{CredentialStore, MemoryCredentialStore, credential_key};
use hostpulse::error::ServiceError;
use hostpulse::plugins::n8n::EXECUTION_FAILED;
use hostpulse::plugins::{AlertResult, default_registry};
use hostpulse::tunnel::TunnelProvider;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::execution_json;

const SERVER: &str = "nas";
const N8N_IMAGE: &str = "docker.n8n.io/n8nio/n8n:1.64.0";

/// Routes every server to one fixed base URL, or fails.
struct FixedTunnel(Option<String>);

#[async_trait]
impl TunnelProvider for FixedTunnel {
    async fn open(&self, _server_id: &str, _remote_port: u16) -> Result<String, ServiceError> {
        self.0
            .clone()
            .ok_or_else(|| ServiceError::Unreachable("tunnel down".into()))
    }
}

fn engine(tunnel: FixedTunnel, api_key: Option<&str>) -> AlertEvaluationEngine {
    let store = MemoryCredentialStore::new();
    if let Some(key) = api_key {
        store
            .set(&credential_key("n8n", "apikey", SERVER), key)
            .unwrap();
    }
    AlertEvaluationEngine::new(
        Arc::new(default_registry()),
        Arc::new(tunnel),
        Arc::new(store),
    )
}

async fn failing_n8n() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/executions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [execution_json("7", "error", 60, Some("wf1"), Some("Backup"))]
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_fires_for_failed_execution() {
    let n8n = failing_n8n().await;
    let engine = engine(FixedTunnel(Some(n8n.uri())), Some("key"));
    let result = engine.evaluate(SERVER, N8N_IMAGE, EXECUTION_FAILED).await;
    assert_eq!(result, AlertResult::Firing("'Backup' failed".into()));
}

#[tokio::test]
async fn test_unmatched_image_is_ok() {
    let n8n = failing_n8n().await;
    let engine = engine(FixedTunnel(Some(n8n.uri())), Some("key"));
    let result = engine.evaluate(SERVER, "postgres:16", EXECUTION_FAILED).await;
    assert_eq!(result, AlertResult::Ok);
}

#[tokio::test]
async fn test_unknown_metric_is_ok() {
    let n8n = failing_n8n().await;
    let engine = engine(FixedTunnel(Some(n8n.uri())), Some("key"));
    let result = engine.evaluate(SERVER, N8N_IMAGE, "disk_full").await;
    assert_eq!(result, AlertResult::Ok);
}

#[tokio::test]
async fn test_missing_credential_is_ok() {
    let n8n = failing_n8n().await;
    let engine = engine(FixedTunnel(Some(n8n.uri())), None);
    let result = engine.evaluate(SERVER, N8N_IMAGE, EXECUTION_FAILED).await;
    assert_eq!(result, AlertResult::Ok);
}

#[tokio::test]
async fn test_tunnel_failure_is_ok() {
    let engine = engine(FixedTunnel(None), Some("key"));
    let result = engine.evaluate(SERVER, N8N_IMAGE, EXECUTION_FAILED).await;
    assert_eq!(result, AlertResult::Ok);
}

#[tokio::test]
async fn test_service_errors_are_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/executions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let engine = engine(FixedTunnel(Some(server.uri())), Some("wrong"));
    let result = engine.evaluate(SERVER, N8N_IMAGE, EXECUTION_FAILED).await;
    assert_eq!(result, AlertResult::Ok);
}

#[tokio::test]
async fn test_evaluate_container_covers_every_metric() {
    let n8n = failing_n8n().await;
    let engine = engine(FixedTunnel(Some(n8n.uri())), Some("key"));

    let results = engine.evaluate_container(SERVER, N8N_IMAGE).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, EXECUTION_FAILED);
    assert!(results[0].1.is_firing());

    assert!(engine.evaluate_container(SERVER, "redis:7").await.is_empty());
}
