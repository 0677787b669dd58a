use std::time::Duration;

use shrink_limiter::{
    select_counter_store, AdmissionController, CounterBackend, CounterStore, Decision,
    LimiterSettings, RedisCounterStore,
};
use shrink_test_infra::redis::RedisServer;

struct Fixture {
    _redis: RedisServer,
    url: String,
    store: RedisCounterStore,
}

impl Fixture {
    async fn start() -> Self {
        let redis = RedisServer::new().await.expect("start redis");
        let url = redis.redis_url().await.expect("redis url");
        let conn = redis.connection().await.expect("redis connection");
        let store = RedisCounterStore::new(conn, Duration::from_secs(2));

        Self {
            _redis: redis,
            url,
            store,
        }
    }
}

#[tokio::test]
async fn increments_share_one_window() {
    let fixture = Fixture::start().await;
    let window = Duration::from_secs(60);

    let first = fixture.store.increment("it:k", window).await.unwrap();
    let second = fixture.store.increment("it:k", window).await.unwrap();

    assert_eq!(first.count, 1);
    assert_eq!(second.count, 2);
    assert!(second.remaining <= window);
    assert!(second.remaining > Duration::from_secs(55));
}

#[tokio::test]
async fn window_expires_in_redis() {
    let fixture = Fixture::start().await;
    let window = Duration::from_millis(300);

    fixture.store.increment("it:short", window).await.unwrap();
    fixture.store.increment("it:short", window).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    let snapshot = fixture.store.increment("it:short", window).await.unwrap();
    assert_eq!(snapshot.count, 1);
}

#[tokio::test]
async fn concurrent_increments_are_atomic() {
    let fixture = Fixture::start().await;
    let mut handles = vec![];

    for _ in 0..40 {
        let store = fixture.store.clone();
        handles.push(tokio::spawn(async move {
            store
                .increment("it:hot", Duration::from_secs(60))
                .await
                .unwrap()
                .count
        }));
    }

    let mut counts = vec![];
    for handle in handles {
        counts.push(handle.await.unwrap());
    }
    counts.sort_unstable();

    assert_eq!(counts, (1..=40).collect::<Vec<u64>>());
}

#[tokio::test]
async fn ping_succeeds_against_live_server() {
    let fixture = Fixture::start().await;

    fixture.store.ping().await.unwrap();
    assert_eq!(fixture.store.backend(), CounterBackend::Redis);
}

#[tokio::test]
async fn reachable_redis_is_selected_and_enforces_limits() {
    let fixture = Fixture::start().await;
    let settings = LimiterSettings::builder()
        .redis_url(Some(fixture.url.clone()))
        .probe_timeout(Duration::from_secs(5))
        .build();

    let selected = select_counter_store(&settings).await;
    assert_eq!(selected.backend(), CounterBackend::Redis);

    let controller = AdmissionController::new(selected.store, &settings);
    assert!(controller.check("encode", "5.5.5.5").await.unwrap().is_allowed());
    assert!(controller.check("encode", "5.5.5.5").await.unwrap().is_allowed());
    assert!(matches!(
        controller.check("encode", "5.5.5.5").await.unwrap(),
        Decision::Deny { limit: 2, .. }
    ));

    // Counters lived in redis, not in the local fallback.
    assert!(selected.local.is_empty());
}
