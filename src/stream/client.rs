// Consumer for `/stats/stream`: decodes frames and reconnects with backoff.

use super::backoff::ReconnectBackoff;
use super::event::{EventKind, StreamEvent, StreamFrame};
use super::sse::{SseDecoder, SseFrame};
use crate::error::ServiceError;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, PartialEq, Eq)]
enum PumpEnd {
    Disconnected,
    ConsumerGone,
}

pub struct StreamClient {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl StreamClient {
    /// `base_url` is the agent root, e.g. `http://10.0.0.5:9100`.
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/stats/stream", base_url.trim_end_matches('/')),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Forward events until `events` is dropped. Transport loss, non-2xx
    /// responses and end-of-stream all lead to a backoff and a new attempt.
    pub async fn run(self, events: mpsc::Sender<StreamEvent>) {
        let mut backoff = ReconnectBackoff::new();
        loop {
            match self.connect().await {
                Ok(response) => {
                    info!(url = %self.url, "stream connected");
                    backoff.reset();
                    if self.pump(response, &events).await == PumpEnd::ConsumerGone {
                        return;
                    }
                }
                Err(e) => warn!(url = %self.url, error = %e, "stream connect failed"),
            }
            let delay = backoff.next_delay();
            debug!(delay_secs = delay.as_secs(), "reconnecting");
            tokio::select! {
                _ = events.closed() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect(&self) -> Result<reqwest::Response, ServiceError> {
        let mut request = self
            .http
            .get(&self.url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = request.send().await?;
        ServiceError::check_status(response.status().as_u16())?;
        Ok(response)
    }

    async fn pump(
        &self,
        response: reqwest::Response,
        events: &mpsc::Sender<StreamEvent>,
    ) -> PumpEnd {
        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();
        loop {
            let chunk = tokio::select! {
                _ = events.closed() => return PumpEnd::ConsumerGone,
                chunk = body.next() => chunk,
            };
            let bytes = match chunk {
                Some(Ok(b)) => b,
                Some(Err(e)) => {
                    warn!(error = %e, "stream read failed");
                    return PumpEnd::Disconnected;
                }
                None => {
                    info!("stream closed by agent");
                    return PumpEnd::Disconnected;
                }
            };
            for frame in decoder.push(&bytes) {
                let SseFrame::Event { event, data } = frame else {
                    continue;
                };
                let Ok(kind) = event.parse::<EventKind>() else {
                    debug!(event = %event, "ignoring unknown event type");
                    continue;
                };
                match (StreamFrame { kind, data }).decode() {
                    Ok(decoded) => {
                        if events.send(decoded).await.is_err() {
                            return PumpEnd::ConsumerGone;
                        }
                    }
                    Err(e) => warn!(event = %kind, error = %e, "undecodable event"),
                }
            }
        }
    }
}
