//! PostgreSQL event log tests
//!
//! All tests share one container; each starts from an empty `events` table.
//! Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use event_store::{
    AggregateId, AppendOptions, EventEnvelope, EventStore, EventStoreError, EventStoreExt,
    PostgresEventStore, Position, Version,
};
use futures_util::StreamExt;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = sqlx::PgPool::connect(&connection_string).await.unwrap();
            PostgresEventStore::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// A store with its own pool over an empty log.
async fn get_test_store() -> PostgresEventStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE events RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresEventStore::new(pool)
}

fn cart_event(cart_id: &str, version: i64) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(cart_id)
        .aggregate_type("ShoppingCart")
        .event_type("ItemUpdated")
        .version(Version::new(version))
        .payload_json(serde_json::json!({
            "cartId": cart_id,
            "productId": "p1",
            "quantity": version,
        }))
        .build()
        .unwrap()
}

fn cart_events(cart_id: &str, versions: std::ops::RangeInclusive<i64>) -> Vec<EventEnvelope> {
    versions.map(|v| cart_event(cart_id, v)).collect()
}

#[tokio::test]
async fn append_and_read_back_payload() {
    let store = get_test_store().await;

    let version = store
        .append(cart_events("c1", 1..=1), AppendOptions::expect_new())
        .await
        .unwrap();
    assert_eq!(version, Version::first());

    let events = store
        .get_events_for_aggregate(&AggregateId::new("c1"))
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "ItemUpdated");
    assert_eq!(events[0].position, Position::new(1));
    assert_eq!(events[0].payload["productId"], "p1");
}

#[tokio::test]
async fn batch_is_appended_in_version_order() {
    let store = get_test_store().await;

    let version = store
        .append(cart_events("c1", 1..=3), AppendOptions::expect_new())
        .await
        .unwrap();
    assert_eq!(version, Version::new(3));

    let versions: Vec<_> = store
        .get_events_for_aggregate(&AggregateId::new("c1"))
        .await
        .unwrap()
        .iter()
        .map(|e| e.version.as_i64())
        .collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[tokio::test]
async fn stale_expected_version_leaves_log_unchanged() {
    let store = get_test_store().await;
    store
        .append(cart_events("c1", 1..=1), AppendOptions::expect_new())
        .await
        .unwrap();

    let result = store
        .append(cart_events("c1", 2..=3), AppendOptions::expect_new())
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));
    assert_eq!(
        store
            .get_aggregate_version(&AggregateId::new("c1"))
            .await
            .unwrap(),
        Some(Version::first())
    );
}

#[tokio::test]
async fn unique_version_constraint_maps_to_conflict() {
    let store = get_test_store().await;
    store
        .append(cart_events("c1", 1..=1), AppendOptions::new())
        .await
        .unwrap();

    let result = store
        .append(cart_events("c1", 1..=1), AppendOptions::new())
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));
}

#[tokio::test]
async fn read_from_version() {
    let store = get_test_store().await;
    store
        .append(cart_events("c1", 1..=3), AppendOptions::new())
        .await
        .unwrap();

    let tail = store
        .get_events_for_aggregate_from_version(&AggregateId::new("c1"), Version::new(2))
        .await
        .unwrap();

    let versions: Vec<_> = tail.iter().map(|e| e.version.as_i64()).collect();
    assert_eq!(versions, vec![2, 3]);
}

#[tokio::test]
async fn stream_resumes_after_position() {
    let store = get_test_store().await;
    for (id, version) in [("a", 1), ("b", 1), ("a", 2), ("b", 2)] {
        store
            .append(vec![cart_event(id, version)], AppendOptions::new())
            .await
            .unwrap();
    }

    let all: Vec<_> = store.stream_all_events().await.unwrap().collect().await;
    assert_eq!(all.len(), 4);

    let tail: Vec<_> = store
        .stream_all_events_from(Position::new(2))
        .await
        .unwrap()
        .map(|e| {
            let e = e.unwrap();
            (e.aggregate_id.into_inner(), e.version.as_i64())
        })
        .collect()
        .await;

    assert_eq!(tail, vec![("a".to_string(), 2), ("b".to_string(), 2)]);
}

#[tokio::test]
async fn concurrent_appends_get_dense_positions() {
    let store = get_test_store().await;

    let mut tasks = Vec::new();
    for n in 0..10 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .append(
                    cart_events(&format!("cart-{n}"), 1..=2),
                    AppendOptions::expect_new(),
                )
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let positions: Vec<_> = store
        .stream_all_events()
        .await
        .unwrap()
        .map(|e| e.unwrap().position.as_i64())
        .collect()
        .await;
    assert_eq!(positions, (1..=20).collect::<Vec<_>>());
}

#[tokio::test]
async fn aggregate_version_tracks_latest_event() {
    let store = get_test_store().await;
    let id = AggregateId::new("c1");

    assert!(!store.aggregate_exists(&id).await.unwrap());

    store
        .append(cart_events("c1", 1..=2), AppendOptions::new())
        .await
        .unwrap();

    assert_eq!(
        store.get_aggregate_version(&id).await.unwrap(),
        Some(Version::new(2))
    );
}
