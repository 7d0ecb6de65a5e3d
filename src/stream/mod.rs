// Live event stream: agent-side multiplexer and client-side consumer.

mod backoff;
mod client;
mod event;
mod multiplexer;
mod sse;

pub use backoff::{INITIAL_BACKOFF, MAX_BACKOFF, ReconnectBackoff};
pub use client::StreamClient;
pub use event::{EventKind, StreamEvent, StreamFrame, SystemPayload};
pub use multiplexer::{StreamCadence, StreamMultiplexer, Subscription};
pub use sse::{SseDecoder, SseFrame};
