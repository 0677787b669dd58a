//! Per-route, per-client admission control for the shrink gateway.
//!
//! Requests are counted in fixed windows held by a [`CounterStore`]: Redis
//! when it is reachable, process-local memory otherwise. The
//! [`AdmissionController`] turns a counter value into an allow/deny
//! [`Decision`].

pub mod admission;
pub mod fallback;
pub mod local;
pub mod redis;
pub mod select;
pub mod settings;

pub use admission::{AdmissionController, Decision};
pub use fallback::FallbackCounterStore;
pub use local::LocalCounterStore;
pub use self::redis::RedisCounterStore;
pub use select::{select_counter_store, SelectedCounterStore};
pub use settings::{
    LimiterSettings, ThrottlePolicy, DEFAULT_KEY_PREFIX, MAX_WINDOW, MIN_WINDOW,
};
pub use shrink_core::{CounterBackend, CounterError, CounterSnapshot, CounterStore};
