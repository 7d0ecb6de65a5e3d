// Per-connection producers, one per event type, each on its own cadence.

use super::event::{EventKind, StreamEvent, StreamFrame, SystemPayload};
use crate::sampler::Sampler;
use crate::services::ServiceDetector;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct StreamCadence {
    pub system: Duration,
    pub docker: Duration,
    pub services: Duration,
    pub keepalive: Duration,
    /// Frames queued per connection before new ones are dropped.
    pub channel_capacity: usize,
}

impl Default for StreamCadence {
    fn default() -> Self {
        Self {
            system: Duration::from_secs(1),
            docker: Duration::from_secs(5),
            services: Duration::from_secs(10),
            keepalive: Duration::from_secs(30),
            channel_capacity: 16,
        }
    }
}

impl StreamCadence {
    pub fn from_config(config: &crate::config::PublishingConfig) -> Self {
        Self {
            system: Duration::from_millis(config.system_interval_ms),
            docker: Duration::from_millis(config.docker_interval_ms),
            services: Duration::from_millis(config.services_interval_ms),
            keepalive: Duration::from_secs(config.keepalive_secs),
            channel_capacity: config.channel_capacity,
        }
    }
}

/// Decrements the live connection count when a subscription's receiver is dropped.
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub struct StreamMultiplexer {
    sampler: Arc<Sampler>,
    services: Arc<ServiceDetector>,
    cadence: StreamCadence,
    top_process_count: usize,
    /// Latest frame per type, replayed to the next connecting client.
    latest: Arc<Mutex<HashMap<EventKind, StreamFrame>>>,
    connections: Arc<AtomicUsize>,
}

impl StreamMultiplexer {
    pub fn new(
        sampler: Arc<Sampler>,
        services: Arc<ServiceDetector>,
        cadence: StreamCadence,
        top_process_count: usize,
    ) -> Self {
        Self {
            sampler,
            services,
            cadence,
            top_process_count,
            latest: Arc::new(Mutex::new(HashMap::new())),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn cadence(&self) -> StreamCadence {
        self.cadence
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn latest(&self, kind: EventKind) -> Option<StreamFrame> {
        self.latest.lock().ok()?.get(&kind).cloned()
    }

    /// Start the producers for one client. They stop once the returned
    /// receiver is dropped.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.cadence.channel_capacity.max(EventKind::ALL.len()));

        if let Ok(latest) = self.latest.lock() {
            for kind in EventKind::ALL {
                if let Some(frame) = latest.get(&kind) {
                    let _ = tx.try_send(frame.clone());
                }
            }
        }

        let sampler = self.sampler.clone();
        let top = self.top_process_count;
        spawn_producer(
            EventKind::System,
            self.cadence.system,
            tx.clone(),
            self.latest.clone(),
            move || {
                let sampler = sampler.clone();
                async move {
                    let (system, processes) =
                        tokio::join!(sampler.sample_system(), sampler.top_processes(top));
                    StreamEvent::System(SystemPayload { system, processes })
                }
            },
        );

        let sampler = self.sampler.clone();
        spawn_producer(
            EventKind::Docker,
            self.cadence.docker,
            tx.clone(),
            self.latest.clone(),
            move || {
                let sampler = sampler.clone();
                async move { StreamEvent::Docker(sampler.sample_containers().await) }
            },
        );

        let sampler = self.sampler.clone();
        let services = self.services.clone();
        spawn_producer(
            EventKind::Services,
            self.cadence.services,
            tx,
            self.latest.clone(),
            move || {
                let sampler = sampler.clone();
                let services = services.clone();
                async move {
                    let containers = sampler.list_containers().await;
                    StreamEvent::Services(services.detect(&containers))
                }
            },
        );

        self.connections.fetch_add(1, Ordering::Relaxed);
        Subscription {
            rx,
            _guard: ConnectionGuard(self.connections.clone()),
        }
    }
}

/// Frames for one connected client.
pub struct Subscription {
    rx: mpsc::Receiver<StreamFrame>,
    _guard: ConnectionGuard,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<StreamFrame> {
        self.rx.recv().await
    }
}

fn spawn_producer<F, Fut>(
    kind: EventKind,
    period: Duration,
    tx: mpsc::Sender<StreamFrame>,
    latest: Arc<Mutex<HashMap<EventKind, StreamFrame>>>,
    mut produce: F,
) where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = StreamEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let event = tokio::select! {
                _ = tx.closed() => break,
                _ = tick.tick() => tokio::select! {
                    _ = tx.closed() => break,
                    event = produce() => event,
                },
            };
            let frame = match event.encode() {
                Ok(f) => f,
                Err(e) => {
                    warn!(error = %e, event = %kind, "event serialization failed; skipping tick");
                    continue;
                }
            };
            if let Ok(mut latest) = latest.lock() {
                latest.insert(kind, frame.clone());
            }
            match tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!(event = %kind, "client queue full; dropping frame");
                }
                Err(TrySendError::Closed(_)) => break,
            }
        }
        debug!(event = %kind, "producer stopped");
    });
}
