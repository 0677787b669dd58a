use clap::{Parser, ValueEnum};
use shrink_limiter::{
    LimiterSettings, ThrottlePolicy, DEFAULT_KEY_PREFIX, MAX_WINDOW, MIN_WINDOW,
};
use shrink_shortener::DEFAULT_MAX_ATTEMPTS;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "SHRINK_LISTEN_ADDR";
pub const PUBLIC_BASE_URL_ENV: &str = "SHRINK_PUBLIC_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "SHRINK_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SHRINK_MYSQL_DSN";
pub const STORE_TIMEOUT_MS_ENV: &str = "SHRINK_STORE_TIMEOUT_MS";
pub const REDIS_URL_ENV: &str = "SHRINK_REDIS_URL";
pub const REDIS_PROBE_TIMEOUT_MS_ENV: &str = "SHRINK_REDIS_PROBE_TIMEOUT_MS";
pub const REDIS_RESPONSE_TIMEOUT_MS_ENV: &str = "SHRINK_REDIS_RESPONSE_TIMEOUT_MS";
pub const GENERATOR_ENV: &str = "SHRINK_GENERATOR";
pub const MAX_ATTEMPTS_ENV: &str = "SHRINK_MAX_ATTEMPTS";
pub const ENCODE_LIMIT_ENV: &str = "SHRINK_ENCODE_LIMIT";
pub const ENCODE_WINDOW_SECS_ENV: &str = "SHRINK_ENCODE_WINDOW_SECS";
/// Accepted throttle window lengths, in seconds.
const WINDOW_SECS_RANGE: RangeInclusive<u64> = MIN_WINDOW.as_secs()..=MAX_WINDOW.as_secs();

pub const DECODE_LIMIT_ENV: &str = "SHRINK_DECODE_LIMIT";
pub const DECODE_WINDOW_SECS_ENV: &str = "SHRINK_DECODE_WINDOW_SECS";
pub const COUNTER_KEY_PREFIX_ENV: &str = "SHRINK_COUNTER_KEY_PREFIX";
pub const LOG_FORMAT_ENV: &str = "SHRINK_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorArg {
    #[value(name = "random")]
    Random,
    #[value(name = "seq")]
    Seq,
}

impl Display for GeneratorArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorArg::Random => write!(f, "random"),
            GeneratorArg::Seq => write!(f, "seq"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "shrink", about = "Rate-limited URL shortener")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Base for returned short URLs. Defaults to `http://{Host}` of each request.
    #[arg(long, env = PUBLIC_BASE_URL_ENV)]
    pub public_base_url: Option<String>,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = STORE_TIMEOUT_MS_ENV, default_value_t = 2_000)]
    pub store_timeout_ms: u64,

    /// Redis for shared throttle counters. Counters stay in-process if unset
    /// or unreachable at startup.
    #[arg(long, env = REDIS_URL_ENV)]
    pub redis_url: Option<String>,

    #[arg(long, env = REDIS_PROBE_TIMEOUT_MS_ENV, default_value_t = 500)]
    pub redis_probe_timeout_ms: u64,

    #[arg(long, env = REDIS_RESPONSE_TIMEOUT_MS_ENV, default_value_t = 250)]
    pub redis_response_timeout_ms: u64,

    #[arg(
        long,
        env = GENERATOR_ENV,
        value_enum,
        default_value_t = GeneratorArg::Random
    )]
    pub generator: GeneratorArg,

    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    #[arg(long, env = ENCODE_LIMIT_ENV, default_value_t = 2)]
    pub encode_limit: u64,

    #[arg(
        long,
        env = ENCODE_WINDOW_SECS_ENV,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(WINDOW_SECS_RANGE)
    )]
    pub encode_window_secs: u64,

    #[arg(long, env = DECODE_LIMIT_ENV, default_value_t = 5)]
    pub decode_limit: u64,

    #[arg(
        long,
        env = DECODE_WINDOW_SECS_ENV,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(WINDOW_SECS_RANGE)
    )]
    pub decode_window_secs: u64,

    #[arg(long, env = COUNTER_KEY_PREFIX_ENV, default_value = DEFAULT_KEY_PREFIX)]
    pub counter_key_prefix: String,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl CLI {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn limiter_settings(&self) -> LimiterSettings {
        LimiterSettings::builder()
            .redis_url(self.redis_url.clone())
            .probe_timeout(Duration::from_millis(self.redis_probe_timeout_ms))
            .response_timeout(Duration::from_millis(self.redis_response_timeout_ms))
            .key_prefix(self.counter_key_prefix.clone())
            .policies(vec![
                ThrottlePolicy::new(
                    "encode",
                    self.encode_limit,
                    Duration::from_secs(self.encode_window_secs),
                ),
                ThrottlePolicy::new(
                    "decode",
                    self.decode_limit,
                    Duration::from_secs(self.decode_window_secs),
                ),
            ])
            .build()
    }
}
