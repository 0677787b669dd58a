use crate::settings::MAX_WINDOW;
use async_trait::async_trait;
use dashmap::DashMap;
use shrink_core::counter::Result;
use shrink_core::{CounterBackend, CounterError, CounterSnapshot, CounterStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// A zero window would expire as it opens and never count past 1.
const SHORTEST_WINDOW: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    expires_at: Instant,
}

/// Process-local fixed-window counters.
///
/// Counts are not shared between gateway instances. Clones share the same
/// counters, so the instance handed to a [`crate::FallbackCounterStore`]
/// can still be swept from outside.
#[derive(Debug, Clone, Default)]
pub struct LocalCounterStore {
    windows: Arc<DashMap<String, Window>>,
}

impl LocalCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every window that has expired. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| window.expires_at > now);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            trace!(removed, "swept expired throttle windows");
        }
        removed
    }

    /// Number of live or not-yet-swept windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[async_trait]
impl CounterStore for LocalCounterStore {
    async fn increment(&self, bucket_key: &str, window: Duration) -> Result<CounterSnapshot> {
        let now = Instant::now();
        let window = window.clamp(SHORTEST_WINDOW, MAX_WINDOW);
        let expires_at = now.checked_add(window).ok_or_else(|| {
            CounterError::Operation(format!("window of {window:?} overflows the clock"))
        })?;

        let mut entry = self
            .windows
            .entry(bucket_key.to_string())
            .or_insert(Window {
                count: 0,
                expires_at,
            });

        if entry.expires_at <= now {
            *entry = Window {
                count: 0,
                expires_at,
            };
        }
        entry.count += 1;

        Ok(CounterSnapshot {
            count: entry.count,
            remaining: entry.expires_at.saturating_duration_since(now),
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> CounterBackend {
        CounterBackend::Local
    }
}
