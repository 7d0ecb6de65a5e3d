// Two-point retained samples for monotonically increasing counters and the rate math on top.

use std::collections::HashMap;
use std::time::Instant;

/// One reading of a monotonically increasing counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCounterSample {
    pub value: u64,
    pub taken_at: Instant,
}

/// Difference between two consecutive samples of the same counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterDelta {
    pub value: u64,
    pub elapsed_secs: f64,
}

impl CounterDelta {
    /// Units per second; 0 when no time elapsed.
    pub fn per_second(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.value as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CounterPair {
    previous: Option<RawCounterSample>,
    current: RawCounterSample,
}

/// Keeps only the previous and current sample per counter key.
#[derive(Debug, Default)]
pub struct CounterStore {
    counters: HashMap<String, CounterPair>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new reading. Returns the delta against the previous reading, or `None`
    /// on the first reading of a key or when the counter went backwards (reset).
    pub fn record(&mut self, key: &str, value: u64, taken_at: Instant) -> Option<CounterDelta> {
        let sample = RawCounterSample { value, taken_at };
        let pair = match self.counters.get_mut(key) {
            Some(pair) => {
                pair.previous = Some(pair.current);
                pair.current = sample;
                *pair
            }
            None => {
                self.counters.insert(
                    key.to_string(),
                    CounterPair {
                        previous: None,
                        current: sample,
                    },
                );
                return None;
            }
        };
        let prev = pair.previous?;
        if sample.value < prev.value {
            return None;
        }
        Some(CounterDelta {
            value: sample.value - prev.value,
            elapsed_secs: sample
                .taken_at
                .saturating_duration_since(prev.taken_at)
                .as_secs_f64(),
        })
    }

    /// Drop every counter under `prefix` whose key is not kept by `keep`.
    pub fn retain_prefixed(&mut self, prefix: &str, keep: impl Fn(&str) -> bool) {
        self.counters
            .retain(|k, _| !k.starts_with(prefix) || keep(k));
    }

    pub(crate) fn len(&self) -> usize {
        self.counters.len()
    }
}

/// Busy percentage from busy/total CPU-time deltas, clamped to [0, 100]. 0 when total did not move.
pub fn cpu_percent(busy: Option<CounterDelta>, total: Option<CounterDelta>) -> f64 {
    match (busy, total) {
        (Some(b), Some(t)) if t.value > 0 => {
            (b.value as f64 / t.value as f64 * 100.0).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}

/// Container CPU relative to one core: may exceed 100 on multi-core hosts, never clamped above.
pub fn container_cpu_percent(
    container: Option<CounterDelta>,
    system: Option<CounterDelta>,
    core_count: u32,
) -> f64 {
    match (container, system) {
        (Some(c), Some(s)) if s.value > 0 => {
            c.value as f64 / s.value as f64 * core_count.max(1) as f64 * 100.0
        }
        _ => 0.0,
    }
}
