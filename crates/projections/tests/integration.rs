//! Integration tests: CartService commands → ProjectionProcessor → cart report.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{CartEvent, CartService, CheckedOutData, Checkout, DomainEvent, UpdateItem};
use event_store::{AppendOptions, EventEnvelope, EventStore, InMemoryEventStore, Position, Version};
use projections::{
    CartReportProjection, InMemoryReportStore, Projection, ProjectionError, ProjectionProcessor,
    ReportStore,
};

/// Helper to set up service, processor and report store.
fn setup() -> (
    InMemoryEventStore,
    CartService<InMemoryEventStore>,
    ProjectionProcessor<InMemoryEventStore>,
    InMemoryReportStore,
) {
    let store = InMemoryEventStore::new();
    let service = CartService::new(store.clone());
    let reports = InMemoryReportStore::new();

    let mut processor = ProjectionProcessor::new(store.clone());
    processor.register(Box::new(CartReportProjection::new(reports.clone())));

    (store, service, processor, reports)
}

async fn timestamps(store: &InMemoryEventStore, cart_id: &str) -> Vec<DateTime<Utc>> {
    store
        .get_events_for_aggregate(&AggregateId::new(cart_id))
        .await
        .unwrap()
        .iter()
        .map(|e| e.decode::<CartEvent>().unwrap().timestamp())
        .collect()
}

#[tokio::test]
async fn report_tracks_creation_and_checkout() {
    let (store, service, processor, reports) = setup();

    service.update_item(UpdateItem::new("c2", "p1", 2)).await.unwrap();
    service.update_item(UpdateItem::new("c2", "p2", 1)).await.unwrap();
    service.checkout(Checkout::new("c2")).await.unwrap();

    processor.run_catch_up().await.unwrap();

    let ts = timestamps(&store, "c2").await;
    let report = reports.get(&AggregateId::new("c2")).await.unwrap().unwrap();
    assert_eq!(report.creation_date, ts[0]);
    assert_eq!(report.checkout_date, Some(ts[2]));
}

#[tokio::test]
async fn report_is_absent_until_projected() {
    let (_store, service, processor, reports) = setup();
    let id = AggregateId::new("c1");

    assert!(reports.get(&id).await.unwrap().is_none());

    service.update_item(UpdateItem::new("c1", "p1", 2)).await.unwrap();
    assert!(reports.get(&id).await.unwrap().is_none());

    processor.run_catch_up().await.unwrap();
    let report = reports.get(&id).await.unwrap().unwrap();
    assert_eq!(report.checkout_date, None);
}

#[tokio::test]
async fn rejected_commands_leave_no_report() {
    let (_store, service, processor, reports) = setup();

    service.update_item(UpdateItem::new("c3", "p1", -1)).await.unwrap();
    service.checkout(Checkout::new("c3")).await.unwrap();
    processor.run_catch_up().await.unwrap();

    assert!(reports.get(&AggregateId::new("c3")).await.unwrap().is_none());
}

#[tokio::test]
async fn removed_items_keep_the_first_creation_date() {
    let (store, service, processor, reports) = setup();

    service.update_item(UpdateItem::new("c1", "p1", 2)).await.unwrap();
    service.update_item(UpdateItem::new("c1", "p1", 0)).await.unwrap();
    service.update_item(UpdateItem::new("c1", "p1", 4)).await.unwrap();
    processor.run_catch_up().await.unwrap();

    let ts = timestamps(&store, "c1").await;
    let report = reports.get(&AggregateId::new("c1")).await.unwrap().unwrap();
    assert_eq!(report.creation_date, ts[0]);
}

#[tokio::test]
async fn incremental_catch_up_matches_rebuild() {
    let (_store, service, processor, reports) = setup();

    for cart in ["a", "b", "c"] {
        service.update_item(UpdateItem::new(cart, "p1", 1)).await.unwrap();
        processor.run_catch_up().await.unwrap();
    }
    service.checkout(Checkout::new("b")).await.unwrap();
    processor.run_catch_up().await.unwrap();

    let mut before = Vec::new();
    for cart in ["a", "b", "c"] {
        before.push(reports.get(&AggregateId::new(cart)).await.unwrap().unwrap());
    }

    let read = processor.rebuild_all().await.unwrap();
    assert_eq!(read, 4);

    for (cart, expected) in ["a", "b", "c"].into_iter().zip(before) {
        let report = reports.get(&AggregateId::new(cart)).await.unwrap().unwrap();
        assert_eq!(report, expected);
    }
    assert_eq!(reports.report_count().await, 3);
}

#[tokio::test]
async fn restarted_projector_resumes_from_stored_cursor() {
    let (store, service, processor, reports) = setup();

    service.update_item(UpdateItem::new("c1", "p1", 1)).await.unwrap();
    processor.run_catch_up().await.unwrap();
    drop(processor);

    service.checkout(Checkout::new("c1")).await.unwrap();

    let mut restarted = ProjectionProcessor::new(store);
    restarted.register(Box::new(CartReportProjection::new(reports.clone())));

    assert_eq!(restarted.run_catch_up().await.unwrap(), 1);
    let report = reports.get(&AggregateId::new("c1")).await.unwrap().unwrap();
    assert!(report.checkout_date.is_some());
}

#[tokio::test]
async fn checkout_for_unknown_cart_halts_without_advancing() {
    let (store, service, processor, reports) = setup();
    let projection = CartReportProjection::new(reports.clone());

    service.update_item(UpdateItem::new("ok", "p1", 1)).await.unwrap();

    // A checkout whose creation was never recorded
    let orphan = CartEvent::CheckedOut(CheckedOutData {
        cart_id: AggregateId::new("orphan"),
        timestamp: Utc::now(),
    });
    let envelope = EventEnvelope::builder()
        .aggregate_id("orphan")
        .aggregate_type("ShoppingCart")
        .event_type(orphan.event_type())
        .version(Version::first())
        .payload(&orphan)
        .unwrap()
        .build()
        .unwrap();
    store
        .append(vec![envelope], AppendOptions::expect_new())
        .await
        .unwrap();

    service.update_item(UpdateItem::new("later", "p1", 1)).await.unwrap();

    let result = processor.run_catch_up().await;
    assert!(matches!(
        result,
        Err(ProjectionError::ConsistencyViolation { ref cart_id, .. })
            if cart_id.as_str() == "orphan"
    ));

    // Work before the violation is kept; nothing at or after it is applied.
    assert_eq!(projection.position().await.unwrap(), Position::new(1));
    assert!(reports.get(&AggregateId::new("ok")).await.unwrap().is_some());
    assert!(reports.get(&AggregateId::new("later")).await.unwrap().is_none());

    // Retrying hits the same event again.
    assert!(processor.run_catch_up().await.is_err());
    assert_eq!(projection.position().await.unwrap(), Position::new(1));
}
