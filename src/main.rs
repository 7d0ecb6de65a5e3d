use anyhow::Result;
use hostpulse::agent::{AgentCommand, AgentControl, RESTART_EXIT_CODE};
use hostpulse::credentials::{CredentialStore, MemoryCredentialStore};
use hostpulse::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let server_id = app_config.server.resolved_server_id();

    let registry = Arc::new(plugins::default_registry());
    let credentials: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
    let sampler = Arc::new(sampler::Sampler::new(docker_repo::DockerRepo::connect()));
    let services = Arc::new(services::ServiceDetector::new(
        registry.clone(),
        credentials.clone(),
        server_id.clone(),
    ));
    let multiplexer = Arc::new(stream::StreamMultiplexer::new(
        sampler.clone(),
        services.clone(),
        stream::StreamCadence::from_config(&app_config.publishing),
        app_config.monitoring.top_process_count,
    ));
    let (agent, mut agent_rx) = AgentControl::new();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            multiplexer: multiplexer.clone(),
            sampler: sampler.clone(),
            agent: agent.clone(),
            shutdown_rx,
        },
        app_config.monitoring.stats_log_interval_secs,
    );

    let app = routes::app(routes::AppState {
        sampler,
        multiplexer,
        services,
        registry,
        credentials,
        agent,
        server_id: server_id.clone(),
        config: app_config.clone(),
    });
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        server_id = %server_id,
        auth = app_config.server.token().is_some(),
        "Listening on http://{}",
        addr
    );

    let mut exit_code = 0;
    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
        }
        command = agent_rx.recv() => {
            tracing::info!(?command, "Agent command received");
            if command == Some(AgentCommand::Restart) {
                exit_code = RESTART_EXIT_CODE;
            }
        }
    }

    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
