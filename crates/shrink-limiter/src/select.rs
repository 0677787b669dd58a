use crate::fallback::FallbackCounterStore;
use crate::local::LocalCounterStore;
use crate::redis::RedisCounterStore;
use crate::settings::LimiterSettings;
use shrink_core::{CounterBackend, CounterError, CounterStore};
use std::sync::Arc;
use tracing::{info, warn};

/// The counter store chosen at startup.
#[derive(Clone)]
pub struct SelectedCounterStore {
    /// The store admission control should count through.
    pub store: Arc<dyn CounterStore>,
    /// The process-local counters behind `store`, for periodic sweeping.
    pub local: LocalCounterStore,
}

impl SelectedCounterStore {
    pub fn backend(&self) -> CounterBackend {
        self.store.backend()
    }
}

/// Picks the counter backend once, at process start.
///
/// With a Redis URL configured, Redis is connected and pinged within
/// `settings.probe_timeout`. A healthy Redis is used behind a
/// [`FallbackCounterStore`]; anything else falls back to local counters.
/// Never fails: the service always starts with some quota enforcement.
pub async fn select_counter_store(settings: &LimiterSettings) -> SelectedCounterStore {
    let local = LocalCounterStore::new();

    let Some(redis_url) = settings.redis_url.as_deref() else {
        info!(backend = %CounterBackend::Local, "no redis configured for throttle counters");
        return local_only(local);
    };

    let probe = async {
        let store = RedisCounterStore::connect(
            redis_url,
            settings.probe_timeout,
            settings.response_timeout,
        )
        .await?;
        store.ping().await?;
        Ok::<_, CounterError>(store)
    };

    let probed = match tokio::time::timeout(settings.probe_timeout, probe).await {
        Ok(result) => result,
        Err(_) => Err(CounterError::Timeout(format!(
            "redis probe took longer than {:?}",
            settings.probe_timeout
        ))),
    };

    match probed {
        Ok(redis) => {
            info!(backend = %CounterBackend::Redis, "using redis for throttle counters");
            SelectedCounterStore {
                store: Arc::new(FallbackCounterStore::new(redis, local.clone())),
                local,
            }
        }
        Err(e) => {
            warn!(
                error = %e,
                "redis unavailable for throttle counters, falling back to in-memory store"
            );
            info!(backend = %CounterBackend::Local, "using local throttle counters");
            local_only(local)
        }
    }
}

fn local_only(local: LocalCounterStore) -> SelectedCounterStore {
    SelectedCounterStore {
        store: Arc::new(local.clone()),
        local,
    }
}
