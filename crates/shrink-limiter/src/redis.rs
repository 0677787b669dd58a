use crate::settings::MAX_WINDOW;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{RedisResult, Script};
use shrink_core::counter::Result;
use shrink_core::{CounterBackend, CounterError, CounterSnapshot, CounterStore};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

/// INCR the bucket, give it a TTL when it is new (or somehow lost its TTL),
/// and report the count with the TTL left, in a single round trip.
const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('PTTL', KEYS[1]) < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return { count, redis.call('PTTL', KEYS[1]) }
"#;

/// Fixed-window counters shared through Redis.
///
/// Every gateway instance pointed at the same Redis enforces one shared
/// quota. Each call is bounded by a response timeout.
#[derive(Debug, Clone)]
pub struct RedisCounterStore {
    conn: MultiplexedConnection,
    script: Script,
    response_timeout: Duration,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CounterError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CounterError::Timeout(message)
    } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        CounterError::Unavailable(message)
    } else {
        CounterError::Operation(message)
    }
}

impl RedisCounterStore {
    pub fn new(conn: MultiplexedConnection, response_timeout: Duration) -> Self {
        Self {
            conn,
            script: Script::new(INCREMENT_SCRIPT),
            response_timeout,
        }
    }

    /// Opens a multiplexed connection to `redis_url`, giving up after
    /// `connect_timeout`.
    pub async fn connect(
        redis_url: &str,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| map_redis_error("invalid redis url", e))?;

        let conn = match tokio::time::timeout(
            connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(conn) => conn.map_err(|e| map_redis_error("failed to connect to redis", e))?,
            Err(_) => {
                return Err(CounterError::Timeout(format!(
                    "connecting to redis took longer than {connect_timeout:?}"
                )))
            }
        };

        debug!("connected to redis counter backend");
        Ok(Self::new(conn, response_timeout))
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = RedisResult<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.response_timeout, fut).await {
            Ok(result) => result.map_err(|e| map_redis_error(operation, e)),
            Err(_) => Err(CounterError::Timeout(format!(
                "{operation}: no response within {:?}",
                self.response_timeout
            ))),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, bucket_key: &str, window: Duration) -> Result<CounterSnapshot> {
        let window = window.min(MAX_WINDOW);
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn.clone();

        let mut invocation = self.script.key(bucket_key);
        invocation.arg(window_ms);
        let (count, pttl): (i64, i64) = self
            .bounded("failed to increment counter", invocation.invoke_async(&mut conn))
            .await
            .inspect_err(|e| debug!(bucket = bucket_key, error = %e, "redis increment failed"))?;

        let remaining = match u64::try_from(pttl) {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => window,
        };
        trace!(bucket = bucket_key, count, ?remaining, "incremented redis counter");

        Ok(CounterSnapshot {
            count: u64::try_from(count).unwrap_or(0),
            remaining,
        })
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = self
            .bounded("failed to ping redis", redis::cmd("PING").query_async(&mut conn))
            .await?;
        trace!(reply = %pong, "redis counter backend answered ping");
        Ok(())
    }

    fn backend(&self) -> CounterBackend {
        CounterBackend::Redis
    }
}
