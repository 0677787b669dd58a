use crate::settings::{ceil_secs, LimiterSettings, ThrottlePolicy};
use shrink_core::counter::Result;
use shrink_core::{CounterBackend, CounterStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request fits the quota. `count` is its position in the current
    /// window; `limit` is `u64::MAX` for routes without a policy.
    Allow { count: u64, limit: u64 },
    /// The quota is used up. Retry after `retry_after_secs` seconds.
    Deny { retry_after_secs: u64, limit: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Applies per-route fixed-window quotas, keyed per client.
pub struct AdmissionController {
    store: Arc<dyn CounterStore>,
    policies: HashMap<String, ThrottlePolicy>,
    key_prefix: String,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn CounterStore>, settings: &LimiterSettings) -> Self {
        let policies = settings
            .policies
            .iter()
            .map(|policy| (policy.route().to_string(), policy.clone()))
            .collect();

        Self {
            store,
            policies,
            key_prefix: settings.key_prefix.clone(),
        }
    }

    pub fn policy(&self, route: &str) -> Option<&ThrottlePolicy> {
        self.policies.get(route)
    }

    pub fn backend(&self) -> CounterBackend {
        self.store.backend()
    }

    fn bucket_key(&self, route: &str, client: &str) -> String {
        format!("{}{}:{}", self.key_prefix, route, client)
    }

    /// Counts one request by `client` against the quota of `route`.
    ///
    /// Routes without a policy are allowed without touching the store.
    pub async fn check(&self, route: &str, client: &str) -> Result<Decision> {
        let Some(policy) = self.policies.get(route) else {
            return Ok(Decision::Allow {
                count: 0,
                limit: u64::MAX,
            });
        };

        let snapshot = self
            .store
            .increment(&self.bucket_key(route, client), policy.window())
            .await?;

        if snapshot.count > policy.limit() {
            let retry_after_secs = ceil_secs(snapshot.remaining).clamp(1, policy.window_secs());
            warn!(
                client,
                route,
                count = snapshot.count,
                limit = policy.limit(),
                retry_after_secs,
                "rate limit exceeded"
            );
            return Ok(Decision::Deny {
                retry_after_secs,
                limit: policy.limit(),
            });
        }

        trace!(client, route, count = snapshot.count, "request admitted");
        Ok(Decision::Allow {
            count: snapshot.count,
            limit: policy.limit(),
        })
    }
}
