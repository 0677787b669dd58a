use crate::error::CounterError;
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub type Result<T> = std::result::Result<T, CounterError>;

/// State of a fixed-window counter right after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Number of hits recorded in the current window, including this one.
    pub count: u64,
    /// Time left until the window expires and the count restarts at 1.
    pub remaining: Duration,
}

/// Which kind of backend is holding the throttle counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterBackend {
    Redis,
    Local,
}

impl Display for CounterBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CounterBackend::Redis => write!(f, "redis"),
            CounterBackend::Local => write!(f, "local"),
        }
    }
}

/// A shared store of expiring counters.
///
/// Counters follow a fixed window: the first increment of a bucket creates
/// it at 1 with an expiry `window` in the future, later increments before
/// the expiry add 1, and once expired the bucket starts over at 1.
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    /// Atomically increments `bucket_key`, creating it if absent or expired.
    async fn increment(&self, bucket_key: &str, window: Duration) -> Result<CounterSnapshot>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// The backend currently serving increments.
    fn backend(&self) -> CounterBackend;
}
