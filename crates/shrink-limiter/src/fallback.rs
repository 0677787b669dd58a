use crate::local::LocalCounterStore;
use async_trait::async_trait;
use shrink_core::counter::Result;
use shrink_core::{CounterBackend, CounterSnapshot, CounterStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Counts through `primary`, and through a local store whenever the primary
/// fails.
///
/// A counter outage therefore never fails a request; quotas are enforced
/// per instance until the primary answers again.
#[derive(Debug)]
pub struct FallbackCounterStore<P> {
    primary: P,
    local: LocalCounterStore,
    degraded: AtomicBool,
}

impl<P: CounterStore> FallbackCounterStore<P> {
    pub fn new(primary: P, local: LocalCounterStore) -> Self {
        Self {
            primary,
            local,
            degraded: AtomicBool::new(false),
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn local(&self) -> &LocalCounterStore {
        &self.local
    }

    /// Whether the last increment had to be served locally.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<P: CounterStore> CounterStore for FallbackCounterStore<P> {
    async fn increment(&self, bucket_key: &str, window: Duration) -> Result<CounterSnapshot> {
        match self.primary.increment(bucket_key, window).await {
            Ok(snapshot) => {
                if self.degraded.swap(false, Ordering::Relaxed) {
                    info!(backend = %self.primary.backend(), "counter backend recovered");
                }
                Ok(snapshot)
            }
            Err(e) => {
                if !self.degraded.swap(true, Ordering::Relaxed) {
                    warn!(
                        backend = %self.primary.backend(),
                        error = %e,
                        "counter backend failed, counting locally"
                    );
                }
                self.local.increment(bucket_key, window).await
            }
        }
    }

    async fn ping(&self) -> Result<()> {
        self.primary.ping().await
    }

    fn backend(&self) -> CounterBackend {
        if self.is_degraded() {
            self.local.backend()
        } else {
            self.primary.backend()
        }
    }
}
