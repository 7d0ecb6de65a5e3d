// GET /stats/stream: one SSE connection, three independently paced event types.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;

use super::AppState;

pub(super) async fn stats_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.multiplexer.subscribe();
    tracing::info!(
        clients = state.multiplexer.connection_count(),
        "stream client connected"
    );

    let events = stream::unfold(subscription, |mut subscription| async move {
        let frame = subscription.recv().await?;
        let event = Event::default().event(frame.kind.as_str()).data(frame.data);
        Some((Ok(event), subscription))
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.multiplexer.cadence().keepalive)
            .text("keepalive"),
    )
}
