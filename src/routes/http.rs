// JSON handlers: health, one-shot stats, lifecycle actions, agent control

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::agent::AgentCommand;
use crate::credentials::credential_key;
use crate::error::{ApiError, ApiResult};
use crate::version::{NAME, VERSION};

/// Purpose used for plugins that do not declare one.
const DEFAULT_CREDENTIAL_PURPOSE: &str = "password";

pub(super) async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /stats: system and containers sampled together.
pub(super) async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let (system, containers) = state.sampler.sample().await;
    Json(json!({ "system": system, "containers": containers }))
}

pub(super) async fn stats_system(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "system": state.sampler.sample_system().await }))
}

pub(super) async fn stats_docker(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "containers": state.sampler.sample_containers().await }))
}

pub(super) async fn stats_processes(State(state): State<AppState>) -> impl IntoResponse {
    let limit = state.config.monitoring.top_process_count;
    Json(json!({ "processes": state.sampler.top_processes(limit).await }))
}

pub(super) async fn stats_services(State(state): State<AppState>) -> impl IntoResponse {
    let containers = state.sampler.list_containers().await;
    Json(json!({ "services": state.services.detect(&containers) }))
}

/// POST /containers/{id}/start|stop|restart
pub(super) async fn container_action(
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let docker = state.sampler.docker();
    let message = match action.as_str() {
        "start" => docker.start(&id).await.map(|_| "started"),
        "stop" => docker.stop(&id).await.map(|_| "stopped"),
        "restart" => docker.restart(&id).await.map(|_| "restarted"),
        other => return Err(ApiError::NotFound(format!("unknown action '{other}'"))),
    }?;
    tracing::info!(container = %id, action = %action, "container action done");
    Ok(Json(json!({ "message": message })))
}

pub(super) async fn kill_process(
    State(state): State<AppState>,
    Path(pid): Path<u32>,
) -> ApiResult<impl IntoResponse> {
    match state.sampler.kill_process(pid).await {
        None => Err(ApiError::NotFound(format!("no such process: {pid}"))),
        Some(false) => Err(ApiError::Internal(format!("failed to kill process {pid}"))),
        Some(true) => {
            tracing::info!(pid, "process killed");
            Ok(Json(json!({ "message": "killed" })))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ConfigureRequest {
    password: String,
}

/// POST /services/{plugin_id}/configure: store the credential the plugin evaluates with.
pub(super) async fn configure_service(
    State(state): State<AppState>,
    Path(plugin_id): Path<String>,
    Json(body): Json<ConfigureRequest>,
) -> ApiResult<impl IntoResponse> {
    let plugin = state
        .registry
        .get(&plugin_id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown plugin '{plugin_id}'")))?;
    if body.password.is_empty() {
        return Err(ApiError::BadRequest("password must be non-empty".into()));
    }
    let purpose = plugin
        .credential_purpose()
        .unwrap_or(DEFAULT_CREDENTIAL_PURPOSE);
    let key = credential_key(plugin.id(), purpose, &state.server_id);
    state.credentials.set(&key, &body.password)?;
    tracing::info!(plugin = %plugin_id, "service credential stored");
    Ok(Json(json!({ "message": "configured" })))
}

pub(super) async fn agent_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": NAME,
        "version": VERSION,
        "serverId": state.server_id,
        "uptimeSecs": state.agent.uptime_secs(),
    }))
}

pub(super) async fn agent_restart(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    send_command(&state, AgentCommand::Restart)?;
    Ok(Json(json!({ "message": "restarting" })))
}

pub(super) async fn agent_stop(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    send_command(&state, AgentCommand::Stop)?;
    Ok(Json(json!({ "message": "stopping" })))
}

fn send_command(state: &AppState, command: AgentCommand) -> ApiResult<()> {
    if state.agent.request(command) {
        tracing::info!(?command, "agent command accepted");
        Ok(())
    } else {
        Err(ApiError::Unavailable("agent control loop is gone".into()))
    }
}
