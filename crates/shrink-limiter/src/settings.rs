use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_KEY_PREFIX: &str = "shrink:throttle:";

/// Shortest throttle window. Anything shorter would let every request open
/// a fresh window.
pub const MIN_WINDOW: Duration = Duration::from_secs(1);
/// Longest throttle window: one day.
pub const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// A request quota for one route: at most `limit` requests per client in
/// each fixed `window`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlePolicy {
    route: String,
    limit: u64,
    window: Duration,
}

impl ThrottlePolicy {
    /// The window is clamped to [`MIN_WINDOW`]..=[`MAX_WINDOW`].
    pub fn new(route: impl Into<String>, limit: u64, window: Duration) -> Self {
        Self {
            route: route.into(),
            limit,
            window: window.clamp(MIN_WINDOW, MAX_WINDOW),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 2 encodes per minute per client.
    pub fn encode_default() -> Self {
        Self::new("encode", 2, Duration::from_secs(60))
    }

    /// 5 decodes per minute per client.
    pub fn decode_default() -> Self {
        Self::new("decode", 5, Duration::from_secs(60))
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::encode_default(), Self::decode_default()]
    }

    /// The window length in whole seconds, rounded up.
    pub fn window_secs(&self) -> u64 {
        ceil_secs(self.window)
    }
}

/// Settings for counter store selection and admission control.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use shrink_limiter::{LimiterSettings, ThrottlePolicy};
///
/// let settings = LimiterSettings::builder()
///     .redis_url(Some("redis://127.0.0.1:6379".to_string()))
///     .policies(vec![ThrottlePolicy::new("encode", 10, Duration::from_secs(30))])
///     .build();
/// assert_eq!(settings.key_prefix, "shrink:throttle:");
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct LimiterSettings {
    /// Redis holding the shared counters. `None` keeps counters local.
    #[builder(default)]
    pub redis_url: Option<String>,

    /// Upper bound on the startup connect + `PING` against Redis.
    #[builder(default = Duration::from_millis(500))]
    pub probe_timeout: Duration,

    /// Upper bound on each counter round trip once running.
    #[builder(default = Duration::from_millis(250))]
    pub response_timeout: Duration,

    #[builder(default = DEFAULT_KEY_PREFIX.to_string(), setter(into))]
    pub key_prefix: String,

    #[builder(default = ThrottlePolicy::defaults())]
    pub policies: Vec<ThrottlePolicy>,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
