// REST client for the n8n public API (v1).

use crate::error::ServiceError;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{ACCEPT, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::instrument;

pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Error,
    Crashed,
    Running,
    Waiting,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InlineWorkflow {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    /// Missing, null or non-string values read as `Unknown`.
    #[serde(default, deserialize_with = "status_or_unknown")]
    pub status: ExecutionStatus,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub workflow_id: Option<String>,
    /// Present when the API inlines the workflow; carries its name.
    #[serde(default)]
    pub workflow_data: Option<InlineWorkflow>,
}

impl Execution {
    pub fn started(&self) -> Option<DateTime<Utc>> {
        self.started_at.as_deref().and_then(parse_timestamp)
    }

    pub fn inline_name(&self) -> Option<&str> {
        self.workflow_data
            .as_ref()
            .and_then(|w| w.name.as_deref())
            .filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookInfo {
    pub path: String,
    pub method: String,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct WorkflowDetail {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    nodes: Vec<WorkflowNode>,
}

#[derive(Debug, Deserialize)]
struct WorkflowNode {
    #[serde(rename = "type", default)]
    node_type: String,
    #[serde(default)]
    parameters: NodeParameters,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeParameters {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    http_method: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn status_or_unknown<'de, D>(deserializer: D) -> Result<ExecutionStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(v @ serde_json::Value::String(_)) => serde_json::from_value(v).unwrap_or_default(),
        _ => ExecutionStatus::Unknown,
    })
}

/// ISO-8601 with fractional seconds first, then whole seconds, then any RFC 3339 offset.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ"))
        .map(|n| n.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        })
}

fn is_webhook_node(node_type: &str) -> bool {
    node_type.eq_ignore_ascii_case("webhook") || node_type.to_ascii_lowercase().ends_with(".webhook")
}

/// Stateless: one instance per evaluation, no cached session.
pub struct N8nClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl N8nClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::Unreachable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;
        ServiceError::check_status(response.status().as_u16())?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    #[instrument(skip(self), fields(service = "n8n", operation = "fetch_executions"))]
    pub async fn fetch_executions(&self, limit: u32) -> Result<Vec<Execution>, ServiceError> {
        let envelope: DataEnvelope<Execution> = self
            .get_json(&format!("/api/v1/executions?limit={limit}"))
            .await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self), fields(service = "n8n", operation = "fetch_workflow_name"))]
    pub async fn fetch_workflow_name(&self, id: &str) -> Result<Option<String>, ServiceError> {
        let detail: WorkflowDetail = self.get_json(&format!("/api/v1/workflows/{id}")).await?;
        Ok(detail.name.filter(|n| !n.is_empty()))
    }

    /// First webhook node of the workflow with a configured path.
    #[instrument(skip(self), fields(service = "n8n", operation = "fetch_webhook_info"))]
    pub async fn fetch_webhook_info(
        &self,
        workflow_id: &str,
    ) -> Result<Option<WebhookInfo>, ServiceError> {
        let detail: WorkflowDetail = self
            .get_json(&format!("/api/v1/workflows/{workflow_id}"))
            .await?;
        let Some(node) = detail.nodes.into_iter().find(|n| is_webhook_node(&n.node_type)) else {
            return Ok(None);
        };
        let Some(path) = node.parameters.path.filter(|p| !p.is_empty()) else {
            return Ok(None);
        };
        let method = node
            .parameters
            .http_method
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "GET".into())
            .to_uppercase();
        Ok(Some(WebhookInfo { path, method }))
    }

    /// Calls the webhook itself; the API key is not sent.
    #[instrument(skip(self), fields(service = "n8n", operation = "trigger_webhook"))]
    pub async fn trigger_webhook(&self, path: &str, method: &str) -> Result<(), ServiceError> {
        let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|e| ServiceError::MalformedResponse(format!("bad webhook method: {e}")))?;
        let url = format!("{}/webhook/{}", self.base_url, path.trim_start_matches('/'));
        let response = self
            .http
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;
        ServiceError::check_status(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_fractional_and_plain_timestamps() {
        let frac = parse_timestamp("2024-03-01T12:30:45.123Z").unwrap();
        assert_eq!(frac.second(), 45);
        assert_eq!(frac.timestamp_subsec_millis(), 123);
        let plain = parse_timestamp("2024-03-01T12:30:45Z").unwrap();
        assert_eq!(plain.minute(), 30);
        let offset = parse_timestamp("2024-03-01T14:30:45+02:00").unwrap();
        assert_eq!(offset, plain);
        assert_eq!(offset.day(), 1);
    }

    #[test]
    fn rejects_unparseable_timestamps() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn execution_accepts_numeric_ids_and_unknown_status() {
        let json = r#"{"id": 42, "status": "new", "workflowId": 7, "startedAt": null}"#;
        let e: Execution = serde_json::from_str(json).unwrap();
        assert_eq!(e.id.as_deref(), Some("42"));
        assert_eq!(e.workflow_id.as_deref(), Some("7"));
        assert_eq!(e.status, ExecutionStatus::Unknown);
        assert!(e.started().is_none());
    }

    #[test]
    fn execution_status_missing_null_or_malformed_is_unknown() {
        for json in [
            r#"{"id": "1"}"#,
            r#"{"id": "1", "status": null}"#,
            r#"{"id": "1", "status": 5}"#,
            r#"{"id": "1", "status": {"code": "error"}}"#,
        ] {
            let e: Execution = serde_json::from_str(json).unwrap();
            assert_eq!(e.status, ExecutionStatus::Unknown, "{json}");
        }
        let e: Execution = serde_json::from_str(r#"{"status": "crashed"}"#).unwrap();
        assert_eq!(e.status, ExecutionStatus::Crashed);
    }

    #[test]
    fn inline_name_ignores_empty_names() {
        let json = r#"{"status": "error", "workflowData": {"name": ""}}"#;
        let e: Execution = serde_json::from_str(json).unwrap();
        assert!(e.inline_name().is_none());
    }

    #[test]
    fn webhook_node_types() {
        assert!(is_webhook_node("webhook"));
        assert!(is_webhook_node("n8n-nodes-base.webhook"));
        assert!(!is_webhook_node("n8n-nodes-base.httpRequest"));
        assert!(!is_webhook_node("n8n-nodes-base.webhookResponder"));
    }
}
