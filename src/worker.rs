// Background worker: periodic "app stats" log line until shutdown.

use crate::agent::AgentControl;
use crate::sampler::Sampler;
use crate::stream::StreamMultiplexer;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};

pub struct WorkerDeps {
    pub multiplexer: Arc<StreamMultiplexer>,
    pub sampler: Arc<Sampler>,
    pub agent: AgentControl,
    pub shutdown_rx: oneshot::Receiver<()>,
}

pub fn spawn(deps: WorkerDeps, stats_log_interval_secs: u64) -> JoinHandle<()> {
    let WorkerDeps {
        multiplexer,
        sampler,
        agent,
        mut shutdown_rx,
    } = deps;

    tokio::spawn(async move {
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        stream_clients = multiplexer.connection_count(),
                        tracked_counters = sampler.tracked_counters(),
                        uptime_secs = agent.uptime_secs(),
                        "app stats"
                    );
                }
            }
        }
    })
}
