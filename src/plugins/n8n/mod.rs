// n8n plugin: alerts on recently failed or crashed workflow executions.

mod client;

pub use client::{
    API_KEY_HEADER, Execution, ExecutionStatus, InlineWorkflow, N8nClient, REQUEST_TIMEOUT,
    WebhookInfo, parse_timestamp,
};

use super::{AlertMetricDefinition, AlertResult, EvaluationContext, Plugin};
use crate::error::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

pub const PLUGIN_ID: &str = "n8n";
pub const DEFAULT_PORT: u16 = 5678;
pub const EXECUTION_FAILED: &str = "execution_failed";

/// How many recent executions are inspected per evaluation.
pub const EXECUTION_SCAN_LIMIT: u32 = 20;
/// Only failures that started within this window fire.
pub const FAILURE_WINDOW: Duration = Duration::from_secs(300);

const METRICS: &[AlertMetricDefinition] = &[AlertMetricDefinition {
    key: EXECUTION_FAILED,
    name: "Workflow execution failed",
    description: "A workflow execution ended in error or crashed within the last 5 minutes",
    poll_interval: Duration::from_secs(60),
}];

pub struct N8nPlugin;

#[async_trait]
impl Plugin for N8nPlugin {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn display_name(&self) -> &str {
        "n8n"
    }

    fn matches(&self, image: &str) -> bool {
        image.contains("n8n")
    }

    fn default_port(&self) -> u16 {
        DEFAULT_PORT
    }

    fn alert_metrics(&self) -> &[AlertMetricDefinition] {
        METRICS
    }

    fn credential_purpose(&self) -> Option<&str> {
        Some("apikey")
    }

    async fn evaluate(
        &self,
        metric_key: &str,
        ctx: &EvaluationContext,
    ) -> Result<AlertResult, ServiceError> {
        match metric_key {
            EXECUTION_FAILED => {
                let api_key = ctx.credential.as_deref().unwrap_or_default();
                let client = N8nClient::new(&ctx.base_url, api_key)?;
                check_failed_executions(&client, Utc::now()).await
            }
            _ => Ok(AlertResult::Ok),
        }
    }
}

/// Failed or crashed executions that started at or after `now - FAILURE_WINDOW`.
pub fn recent_failures(executions: &[Execution], now: DateTime<Utc>) -> Vec<&Execution> {
    let cutoff = now - chrono::Duration::seconds(FAILURE_WINDOW.as_secs() as i64);
    executions
        .iter()
        .filter(|e| matches!(e.status, ExecutionStatus::Error | ExecutionStatus::Crashed))
        .filter(|e| e.started().is_some_and(|t| t >= cutoff))
        .collect()
}

/// Inline name, then a lookup by id, then the id itself; "unknown" only without an id.
pub async fn resolve_workflow_name(client: &N8nClient, execution: &Execution) -> String {
    if let Some(name) = execution.inline_name() {
        return name.to_string();
    }
    let Some(id) = execution.workflow_id.as_deref() else {
        return "unknown".into();
    };
    match client.fetch_workflow_name(id).await {
        Ok(Some(name)) => name,
        Ok(None) => id.to_string(),
        Err(e) => {
            debug!(workflow_id = id, error = %e, "workflow name lookup failed");
            id.to_string()
        }
    }
}

pub fn failure_message(name: &str, status: ExecutionStatus) -> String {
    let verb = if status == ExecutionStatus::Crashed {
        "crashed"
    } else {
        "failed"
    };
    format!("'{name}' {verb}")
}

pub async fn check_failed_executions(
    client: &N8nClient,
    now: DateTime<Utc>,
) -> Result<AlertResult, ServiceError> {
    let executions = client.fetch_executions(EXECUTION_SCAN_LIMIT).await?;
    let failures = recent_failures(&executions, now);
    let Some(latest) = failures.first() else {
        return Ok(AlertResult::Ok);
    };
    let name = resolve_workflow_name(client, latest).await;
    Ok(AlertResult::Firing(failure_message(&name, latest.status)))
}
