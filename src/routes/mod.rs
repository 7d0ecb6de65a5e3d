// HTTP + Server-Sent Events routes

mod auth;
mod http;
mod stream;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::agent::AgentControl;
use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::plugins::PluginRegistry;
use crate::sampler::Sampler;
use crate::services::ServiceDetector;
use crate::stream::StreamMultiplexer;

#[derive(Clone)]
pub struct AppState {
    pub sampler: Arc<Sampler>,
    pub multiplexer: Arc<StreamMultiplexer>,
    pub services: Arc<ServiceDetector>,
    pub registry: Arc<PluginRegistry>,
    pub credentials: Arc<dyn CredentialStore>,
    pub agent: AgentControl,
    pub server_id: String,
    pub config: AppConfig,
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(http::health)) // GET /health, never authenticated
        .route("/stats", get(http::stats)) // GET /stats
        .route("/stats/system", get(http::stats_system))
        .route("/stats/docker", get(http::stats_docker))
        .route("/stats/processes", get(http::stats_processes))
        .route("/stats/services", get(http::stats_services))
        .route("/stats/stream", get(stream::stats_stream)) // SSE /stats/stream
        .route("/containers/{id}/{action}", post(http::container_action))
        .route("/processes/{pid}/kill", post(http::kill_process))
        .route("/services/{plugin_id}/configure", post(http::configure_service))
        .route("/agent/status", get(http::agent_status))
        .route("/agent/restart", post(http::agent_restart))
        .route("/agent/stop", post(http::agent_stop));

    // Wraps the fallback too, so unknown paths and wrong methods answer 401 first.
    if let Some(token) = state.config.server.token() {
        router = router.layer(middleware::from_fn_with_state(
            token.to_string(),
            auth::require_bearer,
        ));
    }

    router
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
